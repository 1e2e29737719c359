//! Session token inspection.
//!
//! Tokens are JWT-shaped: three dot-separated segments, the middle one a
//! base64 JSON object carrying `exp` in seconds since the epoch. Anything
//! that fails to decode is treated as expired so the caller re-authenticates
//! instead of sending a doomed request.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use super::session::Credential;
use crate::api::ApiError;

/// Tokens this close to expiry are already considered expired.
const EXPIRY_SAFETY_MARGIN_MS: i64 = 60_000;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub exp: f64,
}

impl TokenClaims {
    pub fn expires_at_ms(&self) -> i64 {
        (self.exp * 1000.0) as i64
    }
}

/// Decode the claims segment of a token.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ApiError> {
    // Sent verbatim as the Authorization header value
    if let Some(c) = token.chars().find(|c| !c.is_ascii_graphic()) {
        return Err(ApiError::MalformedToken(format!(
            "unexpected character {:?}",
            c
        )));
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ApiError::MalformedToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    // Accept both alphabets, padded or not
    let normalized: String = parts[1]
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = STANDARD_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| ApiError::MalformedToken(format!("invalid base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::MalformedToken(format!("invalid claims: {}", e)))
}

/// Whether `token` should be treated as expired at `now`.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(claims) => now.timestamp_millis() >= claims.expires_at_ms() - EXPIRY_SAFETY_MARGIN_MS,
        Err(e) => {
            debug!(error = %e, "Treating undecodable token as expired");
            true
        }
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

/// A cached credential is usable when it belongs to `expected_identity`
/// and its token has not expired.
pub fn is_usable_at(credential: &Credential, expected_identity: &str, now: DateTime<Utc>) -> bool {
    credential.identity.eq_ignore_ascii_case(expected_identity)
        && !is_expired_at(&credential.token, now)
}

pub fn is_usable(credential: &Credential, expected_identity: &str) -> bool {
    is_usable_at(credential, expected_identity, Utc::now())
}

/// Remaining lifetime of a token (negative once past `exp`).
pub fn expires_in(token: &str) -> Option<Duration> {
    let claims = decode_claims(token).ok()?;
    Some(Duration::milliseconds(
        claims.expires_at_ms() - Utc::now().timestamp_millis(),
    ))
}
