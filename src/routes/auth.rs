// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cognito OAuth authentication routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, AuthError, Result};
use crate::services::id_token::{decode_claims, Claims};
use crate::services::oauth_state::{sign_state, verify_state};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/login", get(login))
        .route("/api/auth/oauth-callback", post(oauth_callback))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/signout", post(signout))
        .route("/api/auth/logout-url", get(logout_url))
}

/// Query parameters for starting the hosted UI flow.
#[derive(Deserialize)]
pub struct LoginParams {
    /// Frontend callback page Cognito should return to.
    /// Defaults to `{FRONTEND_URL}/auth/callback`.
    #[serde(default)]
    redirect_uri: Option<String>,
}

/// Start the authorization code flow - redirect to the Cognito hosted UI.
async fn login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoginParams>,
) -> Result<Redirect> {
    let redirect_uri = params
        .redirect_uri
        .unwrap_or_else(|| format!("{}/auth/callback", state.config.frontend_url));

    if !is_allowed_redirect(&redirect_uri, &state.config.frontend_url) {
        return Err(AppError::BadRequest(
            "redirect_uri must point at the frontend".to_string(),
        ));
    }

    let key = state.config.oauth_state_key.as_deref().ok_or_else(|| {
        AuthError::Configuration("OAUTH_STATE_KEY is not set".to_string())
    })?;
    let oauth_state = sign_state(key, &redirect_uri, now_ms()?)?;
    let auth_url = state.cognito.authorize_url(&redirect_uri, &oauth_state)?;

    tracing::info!(
        redirect_uri = %redirect_uri,
        "Starting OAuth flow, redirecting to Cognito"
    );

    Ok(Redirect::temporary(&auth_url))
}

/// Body posted by the frontend callback page.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackRequest {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "redirectUri")]
    redirect_uri: Option<String>,
    /// Signed state from `/api/auth/login`, checked when present.
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CallbackResponse {
    pub success: bool,
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "IdToken")]
    pub id_token: String,
    #[serde(rename = "RefreshToken")]
    pub refresh_token: Option<String>,
    /// Decoded ID token claims; `null` when the token could not be read.
    pub user: Option<Claims>,
}

/// OAuth callback - exchange the code for tokens and decode the user.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<Json<CallbackResponse>> {
    let Json(request) = payload
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let code = non_empty(request.code.as_deref());
    let redirect_uri = non_empty(request.redirect_uri.as_deref());
    let (Some(code), Some(redirect_uri)) = (code, redirect_uri) else {
        return Err(AppError::BadRequest(
            "Missing required fields: code, redirectUri".to_string(),
        ));
    };

    if let Some(oauth_state) = non_empty(request.state.as_deref()) {
        let key = state.config.oauth_state_key.as_deref().ok_or_else(|| {
            AuthError::Configuration("OAUTH_STATE_KEY is not set".to_string())
        })?;
        match verify_state(key, oauth_state, now_ms()?) {
            Some(issued_for) if issued_for == redirect_uri => {}
            _ => return Err(AppError::BadRequest("Invalid OAuth state".to_string())),
        }
    }

    let tokens = state.cognito.exchange_code(code, redirect_uri).await?;

    let user = match decode_claims(&tokens.id_token) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::warn!(error = %e, "ID token unreadable, returning tokens without user");
            None
        }
    };

    tracing::info!(
        user_id = user.as_ref().map(|c| c.sub.as_str()).unwrap_or("<unknown>"),
        "OAuth callback completed"
    );

    Ok(Json(CallbackResponse {
        success: true,
        access_token: tokens.access_token,
        id_token: tokens.id_token,
        refresh_token: tokens.refresh_token,
        user,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, rename = "refreshToken")]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "IdToken")]
    pub id_token: String,
    #[serde(rename = "ExpiresIn", skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Refresh - trade a refresh token for new access and ID tokens.
async fn refresh(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let Json(request) = payload
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let refresh_token = non_empty(request.refresh_token.as_deref())
        .ok_or_else(|| AppError::BadRequest("Missing required field: refreshToken".to_string()))?;

    let tokens = state.cognito.refresh_tokens(refresh_token).await?;

    Ok(Json(RefreshResponse {
        success: true,
        access_token: tokens.access_token,
        id_token: tokens.id_token,
        expires_in: tokens.expires_in,
    }))
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

/// Sign-out notification. Sessions live on the client, so this only logs.
async fn signout() -> Json<SignOutResponse> {
    tracing::info!("Client signed out");
    Json(SignOutResponse { success: true })
}

#[derive(Deserialize)]
pub struct LogoutUrlParams {
    #[serde(default)]
    logout_uri: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutUrlResponse {
    pub url: String,
}

/// Hosted UI logout URL, for clients that also end the Cognito session.
async fn logout_url(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogoutUrlParams>,
) -> Result<Json<LogoutUrlResponse>> {
    let logout_uri = params
        .logout_uri
        .unwrap_or_else(|| state.config.frontend_url.clone());

    if !is_allowed_redirect(&logout_uri, &state.config.frontend_url) {
        return Err(AppError::BadRequest(
            "logout_uri must point at the frontend".to_string(),
        ));
    }

    let url = state.cognito.logout_url(&logout_uri)?;
    Ok(Json(LogoutUrlResponse { url }))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn now_ms() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// `scheme://host[:port]` of a URL, or `None` without a scheme.
fn origin(url: &str) -> Option<&str> {
    let host_start = url.find("://")? + 3;
    let end = url[host_start..]
        .find(['/', '?', '#'])
        .map_or(url.len(), |i| host_start + i);
    Some(&url[..end])
}

/// The frontend origin or a local dev server, with nothing smuggled in
/// as userinfo.
pub(crate) fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    if origin.contains('@') {
        return false;
    }

    origin == frontend_url.trim_end_matches('/')
        || origin == "http://localhost"
        || origin.starts_with("http://localhost:")
        || origin == "http://127.0.0.1"
        || origin.starts_with("http://127.0.0.1:")
}

/// Redirects may only target the frontend origin or a local dev server.
fn is_allowed_redirect(url: &str, frontend_url: &str) -> bool {
    origin(url).is_some_and(|origin| is_allowed_origin(origin, frontend_url))
}
