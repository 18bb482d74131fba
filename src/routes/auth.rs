// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth login, callback and logout routes.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use anyhow::Context;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::CredentialPair;
use crate::AppState;

/// `state` value that sends the user to the API docs after login.
const SWAGGER_STATE: &str = "swagger";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/login", get(login))
        .route("/users/login-callback", get(login_callback))
        .route("/users/logout", post(logout))
}

/// 302 to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[derive(Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    state: Option<String>,
}

/// Start the OAuth flow - redirect to the provider's login page.
async fn login(State(state): State<Arc<AppState>>, Query(params): Query<LoginParams>) -> Response {
    let oauth_state = params.state.unwrap_or_else(|| SWAGGER_STATE.to_string());
    tracing::info!(state = %oauth_state, "Starting OAuth flow, redirecting to provider");
    found(&state.token_manager.authorize_url(&oauth_state))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange the code, create the user if new, set the cookie.
///
/// Always redirects: to the frontend (or API docs) on success, to the
/// frontend error page on any failure.
async fn login_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Response) {
    let error_url = format!("{}/error", state.config.frontend_url);

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from provider");
        return (jar, found(&error_url));
    }
    let Some(code) = params.code else {
        tracing::warn!("Login callback without authorization code");
        return (jar, found(&error_url));
    };

    let cookie = match complete_login(&state, &code).await {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return (jar, found(&error_url));
        }
    };

    let destination = if params.state.as_deref() == Some(SWAGGER_STATE) {
        "/swagger".to_string()
    } else {
        format!("{}/my-listings", state.config.frontend_url)
    };

    (jar.add(cookie), found(&destination))
}

/// Exchange the code, make sure the user exists and is indexed, and build
/// the credentials cookie.
///
/// The user is indexed on every login so a record whose index write failed
/// earlier is repaired by the next attempt.
async fn complete_login(state: &AppState, code: &str) -> Result<Cookie<'static>> {
    tracing::info!("Exchanging authorization code for tokens");
    let credentials = state.token_manager.exchange_code_for_tokens(code).await?;

    let (email, access_token) = state
        .token_manager
        .authenticate(
            &credentials.access_token,
            credentials.refresh_token.as_deref(),
        )
        .await?;

    let user = match state.users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            let (user, created) = state.store.find_or_create_user(&email)?;
            state.users.add(&user).await?;
            if created {
                tracing::info!(user_id = user.id, "New user created on first login");
            } else {
                tracing::warn!(user_id = user.id, "Re-indexed user missing from search index");
            }
            user
        }
    };
    tracing::info!(user_id = user.id, "User logged in");

    let credentials = CredentialPair {
        access_token,
        refresh_token: credentials.refresh_token,
    };
    state
        .token_manager
        .credentials_cookie(&credentials)
        .context("Failed to encrypt credentials")
        .map_err(AppError::Internal)
}

/// Logout - revoke the access token and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, StatusCode)> {
    let credentials = match state.token_manager.extract_tokens(&headers, &jar) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable credentials on logout, clearing cookie");
            return Ok((jar.remove(state.token_manager.removal_cookie()), StatusCode::OK));
        }
    };

    if let Some(credentials) = credentials {
        state.token_manager.revoke(&credentials.access_token).await?;
    }

    Ok((jar.remove(state.token_manager.removal_cookie()), StatusCode::OK))
}
