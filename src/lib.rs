// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Zaillisy authentication core.
//!
//! Exchanges Cognito authorization codes for tokens, decodes the ID token
//! payload into claims and keeps a client-held session in sync across
//! contexts. The server half exposes the callback endpoint the web client
//! posts its authorization code to.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

use config::Config;
use services::CognitoClient;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub cognito: CognitoClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let cognito = CognitoClient::from_config(&config);
        Self { config, cognito }
    }
}
