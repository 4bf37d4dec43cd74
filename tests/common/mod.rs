// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zaillisy_auth::config::Config;
use zaillisy_auth::routes::create_router;
use zaillisy_auth::session::Navigator;
use zaillisy_auth::AppState;

/// Client ID the mock provider accepts (matches `Config::test_default`).
#[allow(dead_code)]
pub const CLIENT_ID: &str = "test_client_id";

/// Authorization code the mock provider answers with a raw 503 body.
#[allow(dead_code)]
pub const UNAVAILABLE_CODE: &str = "provider-down";

/// Sign an ID token the way Cognito shapes them (signature irrelevant here).
#[allow(dead_code)]
pub fn make_id_token(claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(b"mock-provider-signing-key"),
    )
    .expect("Failed to create ID token")
}

struct ProviderState {
    id_token: String,
    consumed: Mutex<HashSet<String>>,
    requests: AtomicUsize,
    last_form: Mutex<Option<HashMap<String, String>>>,
}

/// A Cognito token endpoint running on a local port.
#[allow(dead_code)]
pub struct MockProvider {
    pub base_url: String,
    state: Arc<ProviderState>,
}

#[allow(dead_code)]
impl MockProvider {
    /// Number of requests the token endpoint has received.
    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Form fields of the most recent request.
    pub fn last_form(&self) -> Option<HashMap<String, String>> {
        self.state.last_form.lock().unwrap().clone()
    }
}

/// Start a mock token endpoint that issues `id_token` for every new code.
///
/// Codes are single use: the second exchange gets `invalid_grant`.
/// The refresh token `"RT"` is accepted for refresh grants.
#[allow(dead_code)]
pub async fn spawn_mock_provider(id_token: String) -> MockProvider {
    let state = Arc::new(ProviderState {
        id_token,
        consumed: Mutex::new(HashSet::new()),
        requests: AtomicUsize::new(0),
        last_form: Mutex::new(None),
    });

    let app = Router::new()
        .route("/oauth2/token", post(token_endpoint))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock provider");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockProvider {
        base_url: format!("http://{}", addr),
        state,
    }
}

async fn token_endpoint(
    State(provider): State<Arc<ProviderState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    provider.requests.fetch_add(1, Ordering::SeqCst);
    *provider.last_form.lock().unwrap() = Some(form.clone());

    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();

    if field("client_id") != CLIENT_ID {
        return provider_error(StatusCode::BAD_REQUEST, "invalid_client", "Unknown client");
    }

    match field("grant_type") {
        "authorization_code" => {
            let code = field("code");
            if code == UNAVAILABLE_CODE {
                return (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable").into_response();
            }
            if field("redirect_uri").is_empty() {
                return provider_error(StatusCode::BAD_REQUEST, "invalid_request", "redirect_uri");
            }
            if !provider.consumed.lock().unwrap().insert(code.to_string()) {
                return provider_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "Invalid authorization code",
                );
            }
            Json(json!({
                "access_token": "AT",
                "id_token": provider.id_token,
                "refresh_token": "RT",
                "expires_in": 3600,
                "token_type": "Bearer"
            }))
            .into_response()
        }
        "refresh_token" if field("refresh_token") == "RT" => Json(json!({
            "access_token": "AT2",
            "id_token": provider.id_token,
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
        .into_response(),
        "refresh_token" => provider_error(
            StatusCode::BAD_REQUEST,
            "invalid_grant",
            "Invalid refresh token",
        ),
        _ => provider_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            "Unsupported grant",
        ),
    }
}

fn provider_error(status: StatusCode, error: &str, description: &str) -> Response {
    (
        status,
        Json(json!({"error": error, "error_description": description})),
    )
        .into_response()
}

/// Create a test app for `config`.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config));
    (create_router(state.clone()), state)
}

/// Navigator that records where it was sent.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().unwrap().push(path.to_string());
    }
}
