// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! Format before encoding: `redirect_uri|timestamp_ms_hex|hmac_sha256_hex`,
//! then URL-safe base64 without padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// States older than this are rejected.
pub const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

/// Sign `redirect_uri` and the issue time into an opaque state string.
pub fn sign_state(key: &[u8], redirect_uri: &str, now_ms: u128) -> anyhow::Result<String> {
    let payload = format!("{}|{:x}", redirect_uri, now_ms);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a state string and return the redirect URI it was issued for.
///
/// `None` when the encoding, signature or age is wrong.
pub fn verify_state(key: &[u8], state: &str, now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The redirect URI may itself contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let redirect_uri = parts.next()?;

    let payload = format!("{}|{}", redirect_uri, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::warn!("OAuth state signature mismatch");
        return None;
    }

    let issued_ms = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_ms) > STATE_MAX_AGE_MS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(redirect_uri.to_string())
}
