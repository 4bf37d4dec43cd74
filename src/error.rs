// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the sign-in flow and their API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures of the authorization-code flow and session persistence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Provider domain or client ID missing. Raised before any I/O.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// DNS, connect, timeout or reset. The caller may retry.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider rejected the grant. Not retryable with the same code.
    #[error("Token exchange failed ({status}): {error}")]
    TokenExchange {
        status: u16,
        error: String,
        error_description: Option<String>,
    },

    #[error("Could not decode ID token claims: {0}")]
    ClaimsDecode(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Only transport failures are worth retrying, and never with a
    /// code that already reached the provider.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, error_description) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request".to_string(),
                Some(msg),
            ),
            AppError::Auth(AuthError::TokenExchange {
                status,
                error,
                error_description,
            }) => {
                let status = StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                tracing::warn!(status = %status, error = %error, "Token exchange rejected");
                (status, error, error_description)
            }
            AppError::Auth(AuthError::Network(msg)) => {
                tracing::error!(error = %msg, "Identity provider unreachable");
                (
                    StatusCode::BAD_GATEWAY,
                    "network_error".to_string(),
                    Some(msg),
                )
            }
            AppError::Auth(AuthError::Configuration(msg)) => {
                tracing::error!(error = %msg, "Authentication is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error".to_string(),
                    Some(msg),
                )
            }
            AppError::Auth(err) => {
                tracing::error!(error = %err, "Authentication error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error,
            error_description,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
