// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-held session record.
//!
//! Serialized as JSON into the single `"session"` storage slot:
//! `{ "user": { "id", "email", "name", "username", "role", "image" }, "expires" }`.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::id_token::Claims;

/// Storage key of the session slot.
pub const SESSION_KEY: &str = "session";

fn default_role() -> String {
    "user".to_string()
}

/// `null` reads the same as a missing field.
fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn role_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|role| !role.is_empty())
        .unwrap_or_else(default_role))
}

/// User portion of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionUser {
    /// ID token `sub`. Absent in a degraded session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub username: String,
    #[serde(default = "default_role", deserialize_with = "role_or_null")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Who is currently signed in on this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Session {
    pub user: SessionUser,
    /// RFC3339 expiry
    pub expires: String,
}

impl Session {
    /// Build a session from decoded claims.
    ///
    /// Expiry is the token's `exp` when present, else `now + default_ttl`.
    /// Without claims the session is degraded: it exists but has no
    /// `user.id`.
    pub fn from_claims(claims: Option<&Claims>, now: DateTime<Utc>, default_ttl: Duration) -> Self {
        let expires = claims
            .and_then(Claims::expires_at)
            .unwrap_or_else(|| now + default_ttl);

        let user = match claims {
            Some(claims) => {
                let email = claims.email.clone().unwrap_or_default();
                SessionUser {
                    id: Some(claims.sub.clone()),
                    username: derive_username(claims.name.as_deref(), &email),
                    name: claims.name.clone(),
                    email,
                    role: claims.role(),
                    image: claims.picture().map(str::to_string),
                }
            }
            None => SessionUser {
                id: None,
                email: String::new(),
                name: None,
                username: String::new(),
                role: default_role(),
                image: None,
            },
        };

        Self {
            user,
            expires: format_utc_rfc3339(expires),
        }
    }

    /// The authenticated user's ID. `None` for a degraded session.
    pub fn user_id(&self) -> Option<&str> {
        self.user.id.as_deref()
    }

    /// Expired, or carrying an expiry that does not parse.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires) {
            Ok(expires) => expires.with_timezone(&Utc) <= now,
            Err(_) => true,
        }
    }

    /// Fill in a missing username from the name or email.
    pub fn backfill_username(&mut self) {
        if self.user.username.is_empty() {
            self.user.username = derive_username(self.user.name.as_deref(), &self.user.email);
        }
    }
}

/// Username fallback: the name lower-cased with whitespace removed, or
/// the local part of the email when there is no name.
pub fn derive_username(name: Option<&str>, email: &str) -> String {
    let from_name: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    if !from_name.is_empty() {
        return from_name;
    }

    email.split('@').next().unwrap_or_default().to_string()
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whether a session is present.
///
/// A degraded session still reads as `Authenticated`; check
/// [`SessionState::user_id`] for a real identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Authenticated,
    Unauthenticated,
}

/// Result of reading the session slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<Session>,
    pub status: SessionStatus,
}

impl SessionState {
    pub fn authenticated(session: Session) -> Self {
        Self {
            session: Some(session),
            status: SessionStatus::Authenticated,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            session: None,
            status: SessionStatus::Unauthenticated,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::user_id)
    }
}
