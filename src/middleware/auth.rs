// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication gate and cookie directive middleware.
//!
//! Request phase: resolve the caller's identity from the credentials cookie
//! or bearer header, refreshing the access token when the provider says it
//! expired. Response phase: set the refreshed cookie or delete a bad one.

use crate::error::{AppError, AuthError};
use crate::models::{CredentialPair, User};
use crate::search::UserIndex;
use crate::services::TokenManager;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated user, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Id of the superuser acting as `user`, if any
    pub impersonated_by: Option<u64>,
}

/// What should happen to the credentials cookie once the response is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieDirective {
    refresh: Option<CredentialPair>,
    delete: bool,
}

/// Resolved form of a [`CookieDirective`].
#[derive(Debug, Clone, PartialEq)]
pub enum CookieAction {
    Keep,
    Refresh(CredentialPair),
    Delete,
}

impl CookieDirective {
    pub fn record_refresh(&mut self, credentials: CredentialPair) {
        self.refresh = Some(credentials);
    }

    pub fn record_delete(&mut self) {
        self.delete = true;
    }

    /// A recorded refresh wins over a recorded delete.
    pub fn resolve(self) -> CookieAction {
        match (self.refresh, self.delete) {
            (Some(credentials), _) => CookieAction::Refresh(credentials),
            (None, true) => CookieAction::Delete,
            (None, false) => CookieAction::Keep,
        }
    }
}

/// Result of running the gate on one request.
#[derive(Debug)]
pub enum AuthOutcome {
    /// No credentials were presented.
    Anonymous,
    Authenticated {
        identity: User,
        cookie: CookieDirective,
    },
    Failed {
        error: AuthError,
        cookie: CookieDirective,
    },
}

/// Maps request credentials to a stored identity.
#[derive(Clone)]
pub struct AuthGate {
    tokens: TokenManager,
    users: UserIndex,
}

impl AuthGate {
    pub fn new(tokens: TokenManager, users: UserIndex) -> Self {
        Self { tokens, users }
    }

    /// Authenticate a request.
    ///
    /// Every failure records a cookie delete. A refresh is recorded only when
    /// the whole chain succeeds and the access token actually changed.
    pub async fn authenticate(&self, headers: &HeaderMap, jar: &CookieJar) -> AuthOutcome {
        let credentials = match self.tokens.extract_tokens(headers, jar) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return AuthOutcome::Anonymous,
            Err(error) => return failed(error),
        };

        match self.resolve(&credentials).await {
            Ok((identity, cookie)) => AuthOutcome::Authenticated { identity, cookie },
            Err(error) => failed(error),
        }
    }

    async fn resolve(
        &self,
        credentials: &CredentialPair,
    ) -> Result<(User, CookieDirective), AuthError> {
        let (email, access_token) = self
            .tokens
            .authenticate(
                &credentials.access_token,
                credentials.refresh_token.as_deref(),
            )
            .await?;

        let identity = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !identity.is_active {
            return Err(AuthError::InactiveUser);
        }

        let mut cookie = CookieDirective::default();
        if access_token != credentials.access_token {
            if let Some(refresh_token) = &credentials.refresh_token {
                tracing::debug!(user_id = identity.id, "Access token refreshed");
                cookie.record_refresh(CredentialPair {
                    access_token,
                    refresh_token: Some(refresh_token.clone()),
                });
            }
        }

        Ok((identity, cookie))
    }

    /// Swap the identity for the user named in the impersonation header.
    ///
    /// Only superusers may impersonate.
    pub async fn impersonate(
        &self,
        identity: User,
        requested: Option<&str>,
    ) -> Result<AuthUser, AppError> {
        let Some(requested) = requested else {
            return Ok(AuthUser {
                user: identity,
                impersonated_by: None,
            });
        };

        if !identity.is_superuser {
            return Err(AppError::Forbidden(
                "Only superusers may impersonate other users".to_string(),
            ));
        }

        let target_id: u64 = requested
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid impersonation user id".to_string()))?;
        let target = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!(
            superuser_id = identity.id,
            user_id = target.id,
            "Impersonating user"
        );
        Ok(AuthUser {
            user: target,
            impersonated_by: Some(identity.id),
        })
    }
}

fn failed(error: AuthError) -> AuthOutcome {
    let mut cookie = CookieDirective::default();
    cookie.record_delete();
    AuthOutcome::Failed { error, cookie }
}

/// Middleware that requires an authenticated, active user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let impersonation = request
        .headers()
        .get(state.config.impersonation_header.as_str())
        .map(|value| value.to_str().unwrap_or_default().to_string());

    let (identity, directive) = match state.auth_gate.authenticate(request.headers(), &jar).await {
        AuthOutcome::Authenticated { identity, cookie } => (identity, cookie),
        AuthOutcome::Anonymous => {
            if impersonation.is_some() {
                return AppError::Forbidden(
                    "Impersonation requires an authenticated superuser".to_string(),
                )
                .into_response();
            }
            return AppError::Unauthenticated.into_response();
        }
        AuthOutcome::Failed { error, cookie } => {
            tracing::warn!(code = error.code(), error = %error, "Authentication failed");
            return apply_cookie_directive(
                &state.token_manager,
                jar,
                cookie,
                AppError::Auth(error).into_response(),
            );
        }
    };

    let auth_user = match state
        .auth_gate
        .impersonate(identity, impersonation.as_deref())
        .await
    {
        Ok(auth_user) => auth_user,
        Err(e) => {
            return apply_cookie_directive(&state.token_manager, jar, directive, e.into_response())
        }
    };

    request.extensions_mut().insert(auth_user);
    let response = next.run(request).await;

    apply_cookie_directive(&state.token_manager, jar, directive, response)
}

/// Response phase: write the directive onto the outgoing response.
pub fn apply_cookie_directive(
    tokens: &TokenManager,
    jar: CookieJar,
    directive: CookieDirective,
    response: Response,
) -> Response {
    match directive.resolve() {
        CookieAction::Keep => response,
        CookieAction::Refresh(credentials) => match tokens.credentials_cookie(&credentials) {
            Ok(cookie) => (jar.add(cookie), response).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encrypt refreshed credentials");
                response
            }
        },
        CookieAction::Delete => (jar.remove(tokens.removal_cookie()), response).into_response(),
    }
}
