// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2/OIDC token lifecycle against the identity provider.
//!
//! Handles:
//! - Credential extraction (encrypted cookie first, then bearer header)
//! - Userinfo validation with a single refresh-and-retry on 401
//! - Authorization-code exchange, refresh and revocation
//! - Building the credentials cookie and its removal
//!
//! Nothing here keeps state between requests; everything lives in the
//! request's cookie or header.

use crate::config::{CookieConfig, ProviderConfig};
use crate::error::AuthError;
use crate::models::CredentialPair;
use crate::services::crypto::{Cipher, CipherError};
use axum::http::{header, HeaderMap, StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;

/// Result of asking the provider who owns an access token.
enum Userinfo {
    Claims(UserinfoResponse),
    /// 401: the token is expired or revoked
    Unauthorized,
    /// Any other 4xx
    Rejected(StatusCode),
}

#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    #[serde(default)]
    email: Option<String>,
}

/// Claims carried by an access token in mock mode.
#[derive(Debug, Deserialize)]
struct MockClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    is_expired: bool,
    #[serde(default)]
    is_invalid: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Identity provider client plus cookie handling for the session credentials.
#[derive(Clone)]
pub struct TokenManager {
    http: reqwest::Client,
    provider: ProviderConfig,
    cookie: CookieConfig,
    cipher: Cipher,
}

impl TokenManager {
    pub fn new(provider: ProviderConfig, cookie: CookieConfig, cipher: Cipher) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider,
            cookie,
            cipher,
        }
    }

    // ─── Credential Extraction ───────────────────────────────────────────────

    /// Pull the credentials out of a request.
    ///
    /// The encrypted cookie wins over the `Authorization` header. A bearer
    /// header yields an access token without refresh capability. `Ok(None)`
    /// means the request is anonymous.
    pub fn extract_tokens(
        &self,
        headers: &HeaderMap,
        jar: &CookieJar,
    ) -> Result<Option<CredentialPair>, AuthError> {
        if let Some(cookie) = jar.get(&self.cookie.name) {
            let json = self.cipher.decrypt(cookie.value())?;
            let credentials: CredentialPair =
                serde_json::from_str(&json).map_err(|_| AuthError::invalid())?;
            return Ok(Some(credentials));
        }

        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let invalid_header = || AuthError::SessionInvalid("Invalid authorization header".to_string());
        let value = value.to_str().map_err(|_| invalid_header())?;

        match value.split_once(' ') {
            Some(("Bearer", token)) if !token.trim().is_empty() => Ok(Some(CredentialPair {
                access_token: token.trim().to_string(),
                refresh_token: None,
            })),
            _ => Err(invalid_header()),
        }
    }

    // ─── Validation ──────────────────────────────────────────────────────────

    /// Resolve the email behind an access token.
    ///
    /// On 401 the refresh token (if any) is exchanged once and userinfo is
    /// retried. Returns the email and the access token that worked, which
    /// differs from the input when a refresh happened.
    pub async fn authenticate(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(String, String), AuthError> {
        let mut access_token = access_token.to_string();

        let claims = match self.userinfo(&access_token).await? {
            Userinfo::Claims(claims) => claims,
            Userinfo::Unauthorized => {
                let Some(refresh_token) = refresh_token else {
                    return Err(AuthError::SessionExpired);
                };
                tracing::debug!("Access token rejected, refreshing");
                access_token = self.refresh_access_token(refresh_token).await?;

                match self.userinfo(&access_token).await? {
                    Userinfo::Claims(claims) => claims,
                    Userinfo::Unauthorized => return Err(AuthError::SessionExpired),
                    Userinfo::Rejected(_) => return Err(AuthError::invalid()),
                }
            }
            Userinfo::Rejected(status) => {
                tracing::debug!(status = %status, "Userinfo rejected access token");
                return Err(AuthError::invalid());
            }
        };

        let email = claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::SessionInvalid("Email not found in the token".to_string()))?;

        Ok((email, access_token))
    }

    async fn userinfo(&self, access_token: &str) -> Result<Userinfo, AuthError> {
        if self.provider.mock_userinfo {
            return Ok(mock_userinfo(access_token));
        }

        let response = self
            .http
            .get(format!("{}/userinfo", self.provider.domain))
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Userinfo request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(Userinfo::Unauthorized);
        }
        if status.is_client_error() {
            return Ok(Userinfo::Rejected(status));
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "Userinfo failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map(Userinfo::Claims)
            .map_err(|e| AuthError::ProviderProtocol(format!("Unreadable userinfo response: {}", e)))
    }

    // ─── OAuth Grants ────────────────────────────────────────────────────────

    /// Exchange an authorization code for tokens. Provider errors are not retried.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<CredentialPair, AuthError> {
        let response = self
            .http
            .post(self.token_url())
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.provider.login_redirect.as_str()),
                ("client_id", self.provider.client_id.as_str()),
                ("client_secret", self.provider.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token exchange failed");
            return Err(AuthError::Provider(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let tokens = parse_token_response(response).await?;
        let access_token = tokens.access_token.ok_or_else(|| {
            AuthError::ProviderProtocol("Access token not found in the response".to_string())
        })?;

        Ok(CredentialPair {
            access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    /// Obtain a new access token with a refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, AuthError> {
        let response = self
            .http
            .post(self.token_url())
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.provider.client_id.as_str()),
                ("client_secret", self.provider.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::SessionExpired);
        }
        if status.is_client_error() {
            return Err(AuthError::invalid());
        }
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        parse_token_response(response)
            .await?
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AuthError::ProviderProtocol("Access token not found in the response".to_string())
            })
    }

    /// Revoke an access token. Failures are surfaced; the caller decides
    /// whether to clear the cookie anyway.
    pub async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(format!("{}/oauth/revoke", self.provider.domain))
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("token", access_token),
                ("token_type_hint", "access_token"),
                ("client_id", self.provider.client_id.as_str()),
                ("client_secret", self.provider.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("Revocation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "Revocation failed with status {}",
                response.status()
            )));
        }

        tracing::info!("Access token revoked");
        Ok(())
    }

    /// Provider login page URL.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?\
             response_type=code&\
             client_id={}&\
             state={}&\
             scope=openid%20email%20offline_access&\
             redirect_uri={}",
            self.provider.domain,
            urlencoding::encode(&self.provider.client_id),
            urlencoding::encode(state),
            urlencoding::encode(&self.provider.login_redirect)
        )
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.provider.domain)
    }

    // ─── Cookies ─────────────────────────────────────────────────────────────

    /// Credentials cookie holding the encrypted JSON pair.
    pub fn credentials_cookie(
        &self,
        credentials: &CredentialPair,
    ) -> Result<Cookie<'static>, CipherError> {
        let json = serde_json::to_string(credentials).map_err(|_| CipherError::Encryption)?;
        let mut cookie = self.base_cookie(self.cipher.encrypt(&json)?);
        cookie.set_max_age(time::Duration::seconds(self.cookie.lifetime_secs));
        Ok(cookie)
    }

    /// Cookie to pass to `CookieJar::remove`; attributes match the ones used
    /// when setting it so browsers drop the right cookie.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.base_cookie(String::new())
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie.name.clone(), value);
        cookie.set_path(self.cookie.path.clone());
        cookie.set_secure(self.cookie.secure);
        cookie.set_http_only(self.cookie.http_only);
        cookie.set_same_site(self.cookie.same_site);
        if let Some(domain) = &self.cookie.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse, AuthError> {
    response
        .json()
        .await
        .map_err(|e| AuthError::ProviderProtocol(format!("Failed to parse token response: {}", e)))
}

/// Mock mode: the access token is itself a JSON claims document.
fn mock_userinfo(access_token: &str) -> Userinfo {
    match serde_json::from_str::<MockClaims>(access_token) {
        Ok(claims) if claims.is_expired => Userinfo::Unauthorized,
        Ok(claims) if claims.is_invalid => Userinfo::Rejected(StatusCode::BAD_REQUEST),
        Ok(claims) => Userinfo::Claims(UserinfoResponse { email: claims.sub }),
        Err(_) => Userinfo::Rejected(StatusCode::BAD_REQUEST),
    }
}
