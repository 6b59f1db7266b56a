//! Persistence of the single authenticated identity
//!
//! Every operation swallows storage-layer failures: they are logged and the
//! caller sees "no data". When no medium is available at all (a non-browser
//! execution context) every operation is a silent no-op.

use std::sync::Arc;

use tracing::{debug, warn};

use super::StorageMedium;
use crate::identity::Identity;

/// Default key the identity record lives under
pub const DEFAULT_SESSION_KEY: &str = "user";

/// Reads and writes the identity record under one well-known key
#[derive(Clone)]
pub struct SessionStore {
    medium: Option<Arc<dyn StorageMedium>>,
    key: String,
}

impl SessionStore {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self::with_key(medium, DEFAULT_SESSION_KEY)
    }

    pub fn with_key(medium: Arc<dyn StorageMedium>, key: impl Into<String>) -> Self {
        Self {
            medium: Some(medium),
            key: key.into(),
        }
    }

    /// A store with no backing medium
    pub fn unavailable() -> Self {
        Self {
            medium: None,
            key: DEFAULT_SESSION_KEY.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.medium.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist the identity, overwriting any previous record
    pub fn save(&self, identity: &Identity) {
        let Some(medium) = &self.medium else { return };

        let json = match serde_json::to_string(identity) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize identity, session not saved");
                return;
            }
        };

        match medium.set_item(&self.key, &json) {
            Ok(()) => debug!(user_id = %identity.user_id, role = %identity.role, "Session saved"),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to save session"),
        }
    }

    /// Load the identity; anything absent, malformed or partial yields `None`
    pub fn load(&self) -> Option<Identity> {
        let medium = self.medium.as_ref()?;

        let raw = match medium.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read session");
                return None;
            }
        };

        parse_record(&raw)
    }

    /// Remove the identity; clearing an empty store is fine
    pub fn clear(&self) {
        let Some(medium) = &self.medium else { return };

        match medium.remove_item(&self.key) {
            Ok(()) => debug!(key = %self.key, "Session cleared"),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to clear session"),
        }
    }
}

fn parse_record(raw: &str) -> Option<Identity> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Stored session is not JSON, ignoring");
            return None;
        }
    };

    let has_token = value
        .as_object()
        .and_then(|obj| obj.get("token"))
        .map(|token| token.is_string())
        .unwrap_or(false);
    if !has_token {
        debug!("Stored session has no token, ignoring");
        return None;
    }

    match serde_json::from_value::<Identity>(value) {
        Ok(identity) => Some(identity),
        Err(e) => {
            debug!(error = %e, "Stored session is incomplete, ignoring");
            None
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("available", &self.is_available())
            .field("key", &self.key)
            .finish()
    }
}
