//! Explicit login and logout

use std::sync::Arc;

use tracing::info;

use super::state::SessionState;
use crate::auth::TokenInspector;
use crate::backend::{Credentials, PortalBackend};
use crate::error::Result;
use crate::identity::Identity;
use crate::routing::{Navigator, RouteTable};
use crate::storage::SessionStore;

/// Login/logout against the store and the in-memory state
#[derive(Clone)]
pub struct SessionActions {
    store: SessionStore,
    state: SessionState,
    inspector: TokenInspector,
    routes: RouteTable,
    navigator: Arc<dyn Navigator>,
}

impl SessionActions {
    pub fn new(
        store: SessionStore,
        state: SessionState,
        inspector: TokenInspector,
        routes: RouteTable,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            state,
            inspector,
            routes,
            navigator,
        }
    }

    /// Adopt an identity returned by the login exchange
    ///
    /// A token that is already unusable is refused so that a dead session is
    /// never persisted.
    pub fn login(&self, identity: Identity) -> Result<()> {
        self.inspector.validate_at(&identity, chrono::Utc::now())?;

        self.store.save(&identity);
        info!(user_id = %identity.user_id, role = %identity.role, "Logged in");
        self.state.set_identity(Some(identity));
        Ok(())
    }

    /// Run the backend exchange, then adopt the identity
    pub async fn login_with(
        &self,
        backend: &dyn PortalBackend,
        credentials: &Credentials,
    ) -> Result<Identity> {
        let identity = backend.login(credentials).await?;
        self.login(identity.clone())?;
        Ok(identity)
    }

    /// Drop the session and return to the login route
    pub fn logout(&self) {
        let user_id = self
            .state
            .snapshot()
            .identity
            .map(|identity| identity.user_id);

        self.store.clear();
        self.state.set_identity(None);
        info!(user_id = ?user_id, "Logged out");
        self.navigator.navigate(&self.routes.login);
    }
}
