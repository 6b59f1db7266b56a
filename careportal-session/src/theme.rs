//! Theme adapter
//!
//! Styling is delegated to whatever UI kit renders the portal. The core only
//! decides which theme tokens apply to the current session.

use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
}

/// Tokens handed to the UI kit's theme provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub mode: ThemeMode,
    pub primary: String,
    pub secondary: String,
    pub font_family: String,
}

/// Boundary to the styling layer
pub trait ThemeAdapter: Send + Sync {
    fn render_theme_provider(&self, role: Option<Role>) -> Theme;
}

/// Default portal palette, tinted per role
#[derive(Debug, Clone)]
pub struct PortalTheme {
    pub mode: ThemeMode,
}

impl Default for PortalTheme {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Light,
        }
    }
}

impl ThemeAdapter for PortalTheme {
    fn render_theme_provider(&self, role: Option<Role>) -> Theme {
        let primary = match role {
            Some(Role::Admin) => "#37474f",
            Some(Role::Doctor) => "#00796b",
            Some(Role::Patient) => "#1976d2",
            Some(Role::Unknown) | None => "#1976d2",
        };

        Theme {
            mode: self.mode,
            primary: primary.to_string(),
            secondary: "#9c27b0".to_string(),
            font_family: "Roboto, Helvetica, Arial, sans-serif".to_string(),
        }
    }
}
