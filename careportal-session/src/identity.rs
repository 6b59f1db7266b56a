//! The authenticated identity record
//!
//! This is the only entity the client persists. The JSON field names match
//! what the portal backend returns from its login endpoint, so a login
//! response can be stored without reshaping.

use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Authenticated identity held by the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub role: Role,
    pub name: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    /// Bearer token, `header.payload.signature`
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(
        role: Role,
        name: impl Into<String>,
        user_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            role,
            name: name.into(),
            user_id: user_id.into(),
            token: token.into(),
            age: None,
            phone: None,
            address: None,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_age(mut self, age: impl Into<String>) -> Self {
        self.age = Some(age.into());
        self
    }
}
