// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The identity provider settings are optional at load time. A missing
//! Cognito domain or client ID is reported as a configuration error when
//! a token exchange is attempted, so the server can still start and serve
//! health checks.

use std::env;

/// Sessions whose ID token carries no `exp` live this long.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cognito hosted UI domain, normalized to carry a scheme
    pub cognito_domain: Option<String>,
    /// Cognito app client ID (public client, no secret)
    pub cognito_client_id: Option<String>,
    /// Frontend URL for CORS and hosted UI redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Fallback session lifetime in seconds
    pub session_ttl_secs: i64,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Option<Vec<u8>>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let session_ttl_secs = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| ConfigError::Invalid("SESSION_TTL_SECS", raw.clone()))?,
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        Ok(Self {
            cognito_domain: non_empty_var("COGNITO_DOMAIN").map(|d| normalize_domain(&d)),
            cognito_client_id: non_empty_var("COGNITO_CLIENT_ID"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            session_ttl_secs,
            oauth_state_key: non_empty_var("OAUTH_STATE_KEY").map(String::into_bytes),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            cognito_domain: Some("https://auth.test.invalid".to_string()),
            cognito_client_id: Some("test_client_id".to_string()),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            oauth_state_key: Some(b"test_state_key_32_bytes_minimum!".to_vec()),
        }
    }

    /// Same as [`Config::test_default`] with the provider at `domain`.
    pub fn test_with_domain(domain: &str) -> Self {
        Self {
            cognito_domain: Some(normalize_domain(domain)),
            ..Self::test_default()
        }
    }
}

/// Prefix a bare host with `https://` and drop any trailing slash.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
