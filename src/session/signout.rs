// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Collaborators of local sign-out: the server notification and navigation.

use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::error::AuthError;

/// Moves the client to another location after sign-out.
pub trait Navigator: Send + Sync {
    /// Full navigation to `path`, discarding in-memory client state.
    fn navigate(&self, path: &str);
}

#[derive(Debug, Deserialize)]
struct SignOutResponse {
    #[serde(default)]
    success: bool,
}

/// Tells the server-side session endpoint that the user signed out.
#[derive(Clone)]
pub struct SignOutNotifier {
    http: reqwest::Client,
    url: String,
}

impl SignOutNotifier {
    /// `api_base` is the origin serving `/api/auth/signout`.
    pub fn new(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/api/auth/signout", api_base.trim_end_matches('/')),
        }
    }

    /// POST the notification and report the server's `success` flag.
    pub async fn notify(&self) -> Result<bool, AuthError> {
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Sign-out request failed: {}", e)))?;

        if !response.status().is_success() {
            return Ok(false);
        }

        let body: SignOutResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Network(format!("Sign-out response unreadable: {}", e)))?;
        Ok(body.success)
    }

    /// Fire and forget. The outcome is only logged.
    ///
    /// Returns `None` when called outside a tokio runtime.
    pub fn notify_detached(&self) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime, skipping sign-out notification");
                return None;
            }
        };

        let notifier = self.clone();
        Some(handle.spawn(async move {
            match notifier.notify().await {
                Ok(true) => tracing::debug!("Server acknowledged sign-out"),
                Ok(false) => tracing::warn!("Server did not acknowledge sign-out"),
                Err(e) => tracing::warn!(error = %e, "Sign-out notification failed"),
            }
        }))
    }
}
