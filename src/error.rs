// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::search::IndexError;
use crate::services::crypto::CipherError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request could not be authenticated.
///
/// Every variant carries a stable machine-readable code (see [`AuthError::code`]).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("The credentials are expired")]
    SessionExpired,

    #[error("{0}")]
    SessionInvalid(String),

    #[error("User is inactive")]
    InactiveUser,

    #[error("User not found")]
    UserNotFound,

    #[error("The credentials could not be decrypted")]
    Decryption(#[from] CipherError),

    #[error("Search index error: {0}")]
    Index(#[from] IndexError),

    #[error("Identity provider error: {0}")]
    Provider(String),

    /// The provider answered 2xx but left out a required field.
    #[error("Identity provider protocol violation: {0}")]
    ProviderProtocol(String),
}

impl AuthError {
    pub const INVALID_CREDENTIALS: &'static str = "The credentials are invalid";

    /// Rejected or malformed credentials with the default message.
    pub fn invalid() -> Self {
        Self::SessionInvalid(Self::INVALID_CREDENTIALS.to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::SessionExpired => "session_expired",
            AuthError::SessionInvalid(_) => "session_invalid",
            AuthError::InactiveUser => "inactive_user",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Decryption(_) => "decryption_failed",
            AuthError::Index(_) => "index_unavailable",
            AuthError::Provider(_) => "provider_error",
            AuthError::ProviderProtocol(_) => "provider_protocol_error",
        }
    }

    /// True when the failure lies with an upstream service rather than the
    /// caller's credentials.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AuthError::Index(_) | AuthError::Provider(_) | AuthError::ProviderProtocol(_)
        )
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Search index error: {0}")]
    Index(#[from] IndexError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthenticated => (
                StatusCode::FORBIDDEN,
                "not_authenticated",
                self.to_string(),
            ),
            AppError::Auth(err) if err.is_upstream() => {
                tracing::error!(error = %err, code = err.code(), "Upstream failure during authentication");
                (StatusCode::BAD_GATEWAY, err.code(), err.to_string())
            }
            AppError::Auth(err) => (StatusCode::FORBIDDEN, err.code(), err.to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "permission_denied", msg.clone()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Index(err) => {
                tracing::error!(error = %err, "Search index error");
                (
                    StatusCode::BAD_GATEWAY,
                    "index_unavailable",
                    "Search index unavailable".to_string(),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
