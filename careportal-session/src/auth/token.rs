//! Bearer token inspection
//!
//! The client never holds the signing secret, so tokens are inspected rather
//! than verified: the payload segment is decoded and its `exp` claim is
//! compared against the clock. Every check fails closed.
//!
//! Decoding is a strict schema parse. The payload must be a JSON object and
//! `exp`, when present, must be numeric; anything else is rejected instead of
//! being read loosely.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TokenError;
use crate::identity::Identity;

/// Claims the client cares about. Unknown claims are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiration time (seconds since epoch)
    #[serde(default)]
    pub exp: Option<f64>,
    /// Issued at (seconds since epoch)
    #[serde(default)]
    pub iat: Option<f64>,
    /// Subject; numeric ids are kept in their decimal form
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub: Option<String>,
    /// Role as issued; informational only, the stored record's role is authoritative
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
}

/// Strings and numbers are read as text; any other shape is ignored
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl TokenClaims {
    /// Expiration in epoch milliseconds
    pub fn expiration_millis(&self) -> Option<i64> {
        self.exp.map(|exp| (exp * 1000.0).round() as i64)
    }
}

/// Stateless inspector for identity tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenInspector;

impl TokenInspector {
    pub fn new() -> Self {
        Self
    }

    /// Decode the payload segment of a three-part token
    pub fn decode_claims(&self, token: &str) -> Result<TokenClaims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::Segments(segments.len()));
        }

        let bytes = decode_segment(segments[1])?;
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| TokenError::Payload(e.to_string()))?;

        if !value.is_object() {
            return Err(TokenError::Payload("payload is not a JSON object".into()));
        }

        serde_json::from_value(value).map_err(|e| TokenError::Payload(e.to_string()))
    }

    /// Check the identity's token against an explicit clock
    pub fn validate_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<(), TokenError> {
        let claims = self.decode_claims(&identity.token)?;

        if let Some(exp) = claims.exp {
            if exp * 1000.0 <= now.timestamp_millis() as f64 {
                return Err(TokenError::Expired);
            }
        }

        Ok(())
    }

    /// Whether an identity holds a structurally sound, unexpired token
    pub fn is_valid(&self, identity: Option<&Identity>) -> bool {
        self.is_valid_at(identity, Utc::now())
    }

    pub fn is_valid_at(&self, identity: Option<&Identity>, now: DateTime<Utc>) -> bool {
        match identity {
            Some(identity) => self.validate_at(identity, now).is_ok(),
            None => false,
        }
    }

    /// `exp * 1000` for a well-formed token carrying `exp`
    pub fn expiration_epoch_millis(&self, token: &str) -> Option<i64> {
        self.decode_claims(token).ok()?.expiration_millis()
    }

    /// Whether the token expires within `minutes` of now
    pub fn expires_within(&self, token: &str, minutes: u32) -> bool {
        self.expires_within_at(token, minutes, Utc::now())
    }

    pub fn expires_within_at(&self, token: &str, minutes: u32, now: DateTime<Utc>) -> bool {
        match self.expiration_epoch_millis(token) {
            Some(expiration) => {
                let remaining_minutes =
                    expiration.saturating_sub(now.timestamp_millis()) as f64 / 60_000.0;
                remaining_minutes <= f64::from(minutes)
            }
            None => false,
        }
    }

    /// Seconds left before expiry; `None` if the token never expires or is malformed
    pub fn time_remaining_at(&self, token: &str, now: DateTime<Utc>) -> Option<i64> {
        self.expiration_epoch_millis(token)
            .map(|expiration| expiration.saturating_sub(now.timestamp_millis()) / 1000)
    }
}

/// Base64url is what the backend emits; the standard alphabet is tolerated too.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let trimmed = segment.trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(TokenError::Encoding);
    }

    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|_| TokenError::Encoding)
}
