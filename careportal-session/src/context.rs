//! Application-scoped wiring of the session components
//!
//! A [`PortalContext`] is created at application start and dropped at
//! teardown. Everything that needs the session receives it (or one of its
//! parts) explicitly, which keeps separate contexts, and separate tests,
//! fully isolated.

use std::sync::Arc;

use crate::auth::TokenInspector;
use crate::config::PortalConfig;
use crate::error::Result;
use crate::routing::{GuardDecision, Navigator, RouteGuard, RouteRequirement};
use crate::session::{GateView, HydrationGate, HydrationOutcome, SessionActions, SessionState};
use crate::storage::{SessionStore, StorageMedium};

#[derive(Clone)]
pub struct PortalContext {
    config: PortalConfig,
    store: SessionStore,
    state: SessionState,
    gate: HydrationGate,
    guard: RouteGuard,
    actions: SessionActions,
}

impl PortalContext {
    /// Wire the components; `medium: None` means no client storage exists
    pub fn new(
        config: PortalConfig,
        medium: Option<Arc<dyn StorageMedium>>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config.validate()?;

        let inspector = TokenInspector::new();
        let store = match medium {
            Some(medium) => SessionStore::with_key(medium, config.session_key.clone()),
            None => SessionStore::unavailable(),
        };
        let state = SessionState::new();
        let gate = HydrationGate::new(store.clone(), state.clone(), inspector);
        let guard = RouteGuard::new(
            config.routes.clone(),
            inspector,
            store.clone(),
            navigator.clone(),
        );
        let actions = SessionActions::new(
            store.clone(),
            state.clone(),
            inspector,
            config.routes.clone(),
            navigator,
        );

        Ok(Self {
            config,
            store,
            state,
            gate,
            guard,
            actions,
        })
    }

    /// Application mount: hydrate once
    pub fn start(&self) -> HydrationOutcome {
        self.gate.run()
    }

    pub fn view(&self) -> GateView {
        self.gate.view()
    }

    /// Route entry: evaluate and apply the guard
    pub fn enter(&self, requirement: &RouteRequirement) -> GuardDecision {
        self.guard.enforce(&self.state, requirement)
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn gate(&self) -> &HydrationGate {
        &self.gate
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn actions(&self) -> &SessionActions {
        &self.actions
    }
}
