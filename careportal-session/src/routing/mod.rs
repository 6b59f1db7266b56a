//! Routing surface used by the session core
//!
//! The core only knows a handful of well-known paths: the login route and
//! one home route per role. Navigation is fire-and-forget through the
//! [`Navigator`] trait.

pub mod guard;

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::Role;

pub use guard::{GuardDecision, RouteGuard, RouteRequirement};

/// Issues navigation requests to the application router
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Well-known paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    pub login: String,
    pub admin_home: String,
    pub doctor_home: String,
    pub patient_home: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            admin_home: "/admin".into(),
            doctor_home: "/doctor".into(),
            patient_home: "/patient".into(),
        }
    }
}

impl RouteTable {
    /// Home route for a role; unknown roles land on login
    pub fn home_for(&self, role: Role) -> &str {
        match role {
            Role::Admin => &self.admin_home,
            Role::Doctor => &self.doctor_home,
            Role::Patient => &self.patient_home,
            Role::Unknown => &self.login,
        }
    }
}

/// Navigator that records the history instead of driving a UI
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn current(&self) -> Option<String> {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&self, path: &str) {
        debug!(path, "Navigate");
        if let Ok(mut history) = self.history.lock() {
            history.push(path.to_string());
        }
    }
}
