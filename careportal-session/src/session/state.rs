//! In-memory session state
//!
//! A single-writer reactive container over a `tokio::sync::watch` channel.
//! The application creates one per lifetime and hands clones to whoever needs
//! to read or observe it; there is no process-global instance.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::auth::Role;
use crate::identity::Identity;

/// Point-in-time view of the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    /// Set once hydration has run; never reverts
    pub hydrated: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }
}

/// Shared handle to the session state
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Record the hydration result and mark the state hydrated
    pub fn set_hydrated(&self, identity: Option<Identity>) {
        debug!(authenticated = identity.is_some(), "Session hydrated");
        self.tx.send_modify(|snapshot| {
            snapshot.identity = identity;
            snapshot.hydrated = true;
        });
    }

    /// Login (`Some`) or logout (`None`)
    pub fn set_identity(&self, identity: Option<Identity>) {
        debug!(authenticated = identity.is_some(), "Session identity changed");
        self.tx.send_modify(|snapshot| snapshot.identity = identity);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn is_hydrated(&self) -> bool {
        self.tx.borrow().hydrated
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    pub fn role(&self) -> Option<Role> {
        self.tx.borrow().role()
    }

    /// Observe every subsequent change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Suspend until hydration has happened, then return the snapshot
    pub async fn wait_hydrated(&self) -> SessionSnapshot {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let snapshot = match rx.wait_for(|snapshot| snapshot.hydrated).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionState").field(&*self.tx.borrow()).finish()
    }
}
