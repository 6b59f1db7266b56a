//! Portal roles and the role-to-home-route mapping

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role carried by an authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Clinic administrator
    Admin,
    /// Practitioner running consultations
    Doctor,
    /// Patient booking appointments
    Patient,
    /// Any role string the portal does not know about
    #[serde(other)]
    Unknown,
}

impl Role {
    /// All roles that own a home route
    pub const KNOWN: [Role; 3] = [Role::Admin, Role::Doctor, Role::Patient];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
            Role::Unknown => "unknown",
        }
    }

    /// Whether this role hosts video consultations
    pub fn hosts_meetings(&self) -> bool {
        matches!(self, Role::Doctor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "doctor" => Role::Doctor,
            "patient" => Role::Patient,
            _ => Role::Unknown,
        })
    }
}
