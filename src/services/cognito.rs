// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cognito OAuth2 client for the public-client authorization code flow.
//!
//! Handles:
//! - Authorization code exchange (`grant_type=authorization_code`)
//! - Token refresh (`grant_type=refresh_token`)
//! - Hosted UI authorize and logout URLs
//!
//! There is no client secret and no internal retry. Resubmitting a
//! consumed authorization code only earns `invalid_grant`, so retry policy
//! belongs to the caller. No timeout is set either; callers that need one
//! pass their own `reqwest::Client` via [`CognitoClient::with_http_client`].

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::error::AuthError;

/// Scopes requested through the hosted UI.
const AUTHORIZE_SCOPES: &str = "openid email profile";

/// Tokens returned by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("id_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Error body of the token endpoint.
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Cognito hosted UI / OAuth2 client.
#[derive(Clone)]
pub struct CognitoClient {
    http: reqwest::Client,
    domain: Option<String>,
    client_id: Option<String>,
}

impl CognitoClient {
    /// Create a client. `domain` must already carry a scheme.
    pub fn new(domain: Option<String>, client_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            domain,
            client_id,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cognito_domain.clone(),
            config.cognito_client_id.clone(),
        )
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Domain and client ID, or a configuration error before any I/O.
    fn provider(&self) -> Result<(&str, &str), AuthError> {
        let domain = self
            .domain
            .as_deref()
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AuthError::Configuration("Cognito domain is not set".to_string()))?;
        let client_id = self
            .client_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AuthError::Configuration("Cognito client ID is not set".to_string())
            })?;
        Ok((domain, client_id))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// POST {domain}/oauth2/token
    /// grant_type=authorization_code&client_id=..&code=..&redirect_uri=..
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, AuthError> {
        let (domain, client_id) = self.provider()?;

        if code.is_empty() || redirect_uri.is_empty() {
            return Err(AuthError::TokenExchange {
                status: 400,
                error: "invalid_request".to_string(),
                error_description: Some("code and redirect_uri are required".to_string()),
            });
        }

        tracing::info!("Exchanging authorization code for tokens");

        let response = self
            .http
            .post(format!("{}/oauth2/token", domain))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token exchange request failed: {}", e)))?;

        read_token_response(response).await
    }

    /// Trade a refresh token for a fresh access and ID token.
    ///
    /// Cognito does not rotate refresh tokens, so the result usually has
    /// `refresh_token: None`.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let (domain, client_id) = self.provider()?;

        let response = self
            .http
            .post(format!("{}/oauth2/token", domain))
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Token refresh request failed: {}", e)))?;

        read_token_response(response).await
    }

    /// Hosted UI login URL for the authorization code flow.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, AuthError> {
        let (domain, client_id) = self.provider()?;
        Ok(format!(
            "{}/oauth2/authorize?\
             response_type=code&\
             client_id={}&\
             redirect_uri={}&\
             scope={}&\
             state={}",
            domain,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(AUTHORIZE_SCOPES),
            urlencoding::encode(state)
        ))
    }

    /// Hosted UI logout URL. Cognito redirects to `logout_uri` afterwards.
    pub fn logout_url(&self, logout_uri: &str) -> Result<String, AuthError> {
        let (domain, client_id) = self.provider()?;
        Ok(format!(
            "{}/logout?client_id={}&logout_uri={}",
            domain,
            urlencoding::encode(client_id),
            urlencoding::encode(logout_uri)
        ))
    }
}

/// Turn a token endpoint response into tokens or a classified error.
async fn read_token_response(response: reqwest::Response) -> Result<TokenSet, AuthError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::Network(format!("Failed to read token response: {}", e)))?;

    if status != StatusCode::OK {
        let err = provider_error(status.as_u16(), &body);
        tracing::warn!(status = %status, "Cognito token endpoint rejected the request");
        return Err(err);
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(error = %e, "Unparseable token response");
        AuthError::TokenExchange {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            error: "invalid_response".to_string(),
            error_description: Some(format!("Failed to parse token response: {}", e)),
        }
    })
}

/// Classify a non-200 body: provider JSON when parseable, else raw text.
fn provider_error(status: u16, body: &str) -> AuthError {
    match serde_json::from_str::<ProviderError>(body) {
        Ok(parsed) => AuthError::TokenExchange {
            status,
            error: parsed.error,
            error_description: parsed.error_description,
        },
        Err(_) => {
            let raw = body.trim();
            AuthError::TokenExchange {
                status,
                error: if raw.is_empty() {
                    format!("http_{}", status)
                } else {
                    raw.to_string()
                },
                error_description: None,
            }
        }
    }
}
