//! Session core configuration

use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};
use crate::routing::RouteTable;
use crate::storage::session_store::DEFAULT_SESSION_KEY;

/// Settings the embedding application may override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Storage key holding the identity record
    pub session_key: String,
    pub routes: RouteTable,
    /// Minutes before expiry at which a session counts as "expiring soon"
    pub expiry_warning_minutes: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            session_key: DEFAULT_SESSION_KEY.to_string(),
            routes: RouteTable::default(),
            expiry_warning_minutes: 5,
        }
    }
}

impl PortalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.session_key.trim().is_empty() {
            return Err(PortalError::Config("session key must not be empty".into()));
        }

        let routes = [
            ("login", &self.routes.login),
            ("admin home", &self.routes.admin_home),
            ("doctor home", &self.routes.doctor_home),
            ("patient home", &self.routes.patient_home),
        ];
        for (name, path) in routes {
            if !path.starts_with('/') {
                return Err(PortalError::Config(format!(
                    "{} route must be an absolute path, got '{}'",
                    name, path
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PortalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_route() {
        let mut config = PortalConfig::default();
        config.routes.login = "login".into();
        assert!(matches!(config.validate(), Err(PortalError::Config(_))));
    }

    #[test]
    fn test_rejects_blank_key() {
        let config = PortalConfig {
            session_key: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PortalConfig =
            serde_json::from_str(r#"{"routes":{"login":"/signin"}}"#).unwrap();
        assert_eq!(config.session_key, "user");
        assert_eq!(config.routes.login, "/signin");
        assert_eq!(config.routes.admin_home, "/admin");
        assert_eq!(config.expiry_warning_minutes, 5);
    }
}
