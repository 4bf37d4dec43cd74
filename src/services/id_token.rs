// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unverified decoding of Cognito ID token payloads.
//!
//! This is a parser, not a verifier. Signature, `exp`, `nbf`, `iss` and
//! `aud` are never checked here, so the claims are informational only:
//! they label a client-side session and must not gate server-side
//! authorization without independent verification of the token.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Standard alphabet that accepts both padded and unpadded input.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried by an ID token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Claims {
    /// Subject (Cognito user pool user ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cognito emits this as a bool or as `"true"`/`"false"`.
    #[serde(default, deserialize_with = "bool_or_string")]
    pub email_verified: bool,
    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Every other claim, passed through untouched.
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Role for the session: `custom:role`, else the first Cognito group,
    /// else `"user"`.
    pub fn role(&self) -> String {
        self.extra
            .get("custom:role")
            .and_then(Value::as_str)
            .or_else(|| {
                self.extra
                    .get("cognito:groups")
                    .and_then(Value::as_array)
                    .and_then(|groups| groups.first())
                    .and_then(Value::as_str)
            })
            .filter(|role| !role.is_empty())
            .unwrap_or("user")
            .to_string()
    }

    /// Profile picture URL, if the pool maps one.
    pub fn picture(&self) -> Option<&str> {
        self.extra.get("picture").and_then(Value::as_str)
    }

    /// `exp` as a timestamp. `None` when absent or out of range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Decode the payload segment of a compact JWT into [`Claims`].
///
/// The segment is URL-safe base64 (`-`/`_`), with or without padding.
/// Decoded bytes are interpreted as UTF-8 as a whole, so multi-byte
/// characters in names survive intact.
pub fn decode_claims(id_token: &str) -> Result<Claims, AuthError> {
    let segments: Vec<&str> = id_token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::ClaimsDecode(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let standard = segments[1].replace('-', "+").replace('_', "/");
    let bytes = SEGMENT_ENGINE
        .decode(standard.as_bytes())
        .map_err(|e| AuthError::ClaimsDecode(format!("invalid base64 payload: {e}")))?;

    let json = String::from_utf8(bytes)
        .map_err(|e| AuthError::ClaimsDecode(format!("payload is not UTF-8: {e}")))?;

    serde_json::from_str(&json)
        .map_err(|e| AuthError::ClaimsDecode(format!("invalid claims JSON: {e}")))
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}
