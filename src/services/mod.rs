// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - identity provider and token handling.

pub mod cognito;
pub mod id_token;
pub mod oauth_state;

pub use cognito::{CognitoClient, TokenSet};
pub use id_token::{decode_claims, Claims};
