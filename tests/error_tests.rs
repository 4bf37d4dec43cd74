// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use zaillisy_auth::error::{AppError, AuthError};

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_only_network_errors_are_retryable() {
    assert!(AuthError::Network("reset".to_string()).is_retryable());

    let rejected = AuthError::TokenExchange {
        status: 400,
        error: "invalid_grant".to_string(),
        error_description: None,
    };
    assert!(!rejected.is_retryable());
    assert!(!AuthError::Configuration("no domain".to_string()).is_retryable());
    assert!(!AuthError::ClaimsDecode("bad".to_string()).is_retryable());
    assert!(!AuthError::Storage("disk full".to_string()).is_retryable());
}

#[tokio::test]
async fn test_token_exchange_status_is_mirrored() {
    let (status, body) = render(
        AuthError::TokenExchange {
            status: 401,
            error: "invalid_client".to_string(),
            error_description: Some("Client is not enabled".to_string()),
        }
        .into(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_client");
    assert_eq!(body["error_description"], "Client is not enabled");
}

#[tokio::test]
async fn test_non_error_provider_status_becomes_500() {
    let (status, body) = render(
        AuthError::TokenExchange {
            status: 302,
            error: "http_302".to_string(),
            error_description: None,
        }
        .into(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("error_description").is_none());
}

#[tokio::test]
async fn test_error_status_mapping() {
    let cases = [
        (
            AppError::BadRequest("Missing code".to_string()),
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
        (
            AuthError::Network("timed out".to_string()).into(),
            StatusCode::BAD_GATEWAY,
            "network_error",
        ),
        (
            AuthError::Configuration("no client id".to_string()).into(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "configuration_error",
        ),
        (
            AuthError::Storage("disk full".to_string()).into(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
        ),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
        ),
    ];

    for (err, expected_status, expected_error) in cases {
        let (status, body) = render(err).await;
        assert_eq!(status, expected_status);
        assert_eq!(body["error"], expected_error);
    }
}
