//! Per-route authentication and role enforcement
//!
//! [`RouteGuard::evaluate`] is a pure decision table over the current session
//! snapshot. [`RouteGuard::enforce`] applies the decision: it clears the
//! stored session when asked to and fires a navigation request. Navigation is
//! not awaited or confirmed, and nothing is retried.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{Navigator, RouteTable};
use crate::auth::{Role, TokenInspector};
use crate::session::{SessionSnapshot, SessionState};
use crate::storage::SessionStore;

/// Access requirements declared by a protected page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirement {
    /// `None` admits every role
    pub allowed_roles: Option<HashSet<Role>>,
    pub require_auth: bool,
}

impl Default for RouteRequirement {
    fn default() -> Self {
        Self {
            allowed_roles: None,
            require_auth: true,
        }
    }
}

impl RouteRequirement {
    /// Any authenticated identity
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Authenticated identity holding one of `roles`
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: Some(roles.into_iter().collect()),
            require_auth: true,
        }
    }

    /// Page reachable without a session
    pub fn public() -> Self {
        Self {
            allowed_roles: None,
            require_auth: false,
        }
    }

    fn admits(&self, role: Role) -> bool {
        self.allowed_roles
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&role))
    }
}

/// Why a redirect was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    Unauthenticated,
    InvalidToken,
    RoleNotAllowed,
}

/// Outcome of evaluating a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Hydration pending; show the blocking loading view
    Loading,
    /// Send the user elsewhere
    Redirect {
        to: String,
        clear_session: bool,
        reason: RedirectReason,
    },
    /// Render the protected content
    Render,
}

/// Enforces [`RouteRequirement`]s against the session
#[derive(Clone)]
pub struct RouteGuard {
    routes: RouteTable,
    inspector: TokenInspector,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(
        routes: RouteTable,
        inspector: TokenInspector,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            routes,
            inspector,
            store,
            navigator,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn evaluate(&self, snapshot: &SessionSnapshot, requirement: &RouteRequirement) -> GuardDecision {
        self.evaluate_at(snapshot, requirement, Utc::now())
    }

    pub fn evaluate_at(
        &self,
        snapshot: &SessionSnapshot,
        requirement: &RouteRequirement,
        now: DateTime<Utc>,
    ) -> GuardDecision {
        if !snapshot.hydrated {
            return GuardDecision::Loading;
        }

        let Some(identity) = snapshot.identity.as_ref() else {
            if requirement.require_auth {
                return self.redirect_to_login(false, RedirectReason::Unauthenticated);
            }
            return GuardDecision::Render;
        };

        if !self.inspector.is_valid_at(Some(identity), now) {
            return self.redirect_to_login(true, RedirectReason::InvalidToken);
        }

        if !requirement.admits(identity.role) {
            return GuardDecision::Redirect {
                to: self.routes.home_for(identity.role).to_string(),
                clear_session: false,
                reason: RedirectReason::RoleNotAllowed,
            };
        }

        GuardDecision::Render
    }

    /// Evaluate against the live state and apply the side effects
    pub fn enforce(&self, state: &SessionState, requirement: &RouteRequirement) -> GuardDecision {
        let decision = self.evaluate(&state.snapshot(), requirement);
        self.apply(&decision);
        decision
    }

    /// Clear and navigate as the decision demands
    pub fn apply(&self, decision: &GuardDecision) {
        match decision {
            GuardDecision::Redirect {
                to,
                clear_session,
                reason,
            } => {
                info!(to = %to, reason = ?reason, "Route guard redirect");
                if *clear_session {
                    self.store.clear();
                }
                self.navigator.navigate(to);
            }
            GuardDecision::Loading => debug!("Route guard waiting for hydration"),
            GuardDecision::Render => {}
        }
    }

    fn redirect_to_login(&self, clear_session: bool, reason: RedirectReason) -> GuardDecision {
        GuardDecision::Redirect {
            to: self.routes.login.clone(),
            clear_session,
            reason,
        }
    }
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("routes", &self.routes)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::routing::MemoryNavigator;
    use crate::storage::MemoryStorage;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn token(exp_offset: i64) -> String {
        let payload = format!(r#"{{"exp":{}}}"#, now().timestamp() + exp_offset);
        format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload))
    }

    fn hydrated(identity: Option<Identity>) -> SessionSnapshot {
        SessionSnapshot {
            identity,
            hydrated: true,
        }
    }

    fn guard() -> (RouteGuard, Arc<MemoryNavigator>, SessionStore) {
        let navigator = Arc::new(MemoryNavigator::new());
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        let guard = RouteGuard::new(
            RouteTable::default(),
            TokenInspector::new(),
            store.clone(),
            navigator.clone(),
        );
        (guard, navigator, store)
    }

    #[test]
    fn test_not_hydrated_is_loading() {
        let (guard, _, _) = guard();
        let snapshot = SessionSnapshot::default();
        for req in [
            RouteRequirement::authenticated(),
            RouteRequirement::public(),
            RouteRequirement::roles([Role::Admin]),
        ] {
            assert_eq!(guard.evaluate_at(&snapshot, &req, now()), GuardDecision::Loading);
        }
    }

    #[test]
    fn test_unauthenticated_redirects_to_login() {
        let (guard, _, _) = guard();
        assert_eq!(
            guard.evaluate_at(&hydrated(None), &RouteRequirement::authenticated(), now()),
            GuardDecision::Redirect {
                to: "/login".into(),
                clear_session: false,
                reason: RedirectReason::Unauthenticated,
            }
        );
    }

    #[test]
    fn test_public_route_renders_without_session() {
        let (guard, _, _) = guard();
        assert_eq!(
            guard.evaluate_at(&hydrated(None), &RouteRequirement::public(), now()),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_expired_token_clears_and_redirects() {
        let (guard, _, _) = guard();
        let identity = Identity::new(Role::Patient, "Pat", "p", token(-1));
        assert_eq!(
            guard.evaluate_at(&hydrated(Some(identity)), &RouteRequirement::authenticated(), now()),
            GuardDecision::Redirect {
                to: "/login".into(),
                clear_session: true,
                reason: RedirectReason::InvalidToken,
            }
        );
    }

    #[test]
    fn test_wrong_role_goes_home() {
        let (guard, _, _) = guard();
        let cases = [
            (Role::Doctor, "/doctor"),
            (Role::Patient, "/patient"),
            (Role::Unknown, "/login"),
        ];
        for (role, home) in cases {
            let identity = Identity::new(role, "N", "1", token(600));
            let decision = guard.evaluate_at(
                &hydrated(Some(identity)),
                &RouteRequirement::roles([Role::Admin]),
                now(),
            );
            assert_eq!(
                decision,
                GuardDecision::Redirect {
                    to: home.into(),
                    clear_session: false,
                    reason: RedirectReason::RoleNotAllowed,
                }
            );
        }
    }

    #[test]
    fn test_allowed_role_renders() {
        let (guard, _, _) = guard();
        let identity = Identity::new(Role::Doctor, "Dr. X", "1", token(600));
        let req = RouteRequirement::roles([Role::Doctor, Role::Admin]);
        assert_eq!(
            guard.evaluate_at(&hydrated(Some(identity.clone())), &req, now()),
            GuardDecision::Render
        );
        assert_eq!(
            guard.evaluate_at(&hydrated(Some(identity)), &RouteRequirement::authenticated(), now()),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_public_route_still_validates_present_identity() {
        let (guard, _, _) = guard();
        let identity = Identity::new(Role::Doctor, "Dr. X", "1", "garbage");
        let decision =
            guard.evaluate_at(&hydrated(Some(identity)), &RouteRequirement::public(), now());
        assert!(matches!(
            decision,
            GuardDecision::Redirect {
                clear_session: true,
                ..
            }
        ));
    }

    #[test]
    fn test_apply_clears_and_navigates() {
        let (guard, navigator, store) = guard();
        let identity = Identity::new(Role::Doctor, "Dr. X", "1", "garbage");
        store.save(&identity);

        let state = SessionState::new();
        state.set_hydrated(Some(identity));

        let decision = guard.enforce(&state, &RouteRequirement::authenticated());
        assert!(matches!(decision, GuardDecision::Redirect { .. }));
        assert_eq!(store.load(), None);
        assert_eq!(navigator.history(), vec!["/login"]);
    }

    #[test]
    fn test_loading_and_render_do_not_navigate() {
        let (guard, navigator, _) = guard();
        guard.apply(&GuardDecision::Loading);
        guard.apply(&GuardDecision::Render);
        assert!(navigator.history().is_empty());
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let (guard, _, _) = guard();
        let snapshot = hydrated(Some(Identity::new(Role::Patient, "Pat", "p", token(600))));
        let req = RouteRequirement::roles([Role::Patient]);
        let first = guard.evaluate_at(&snapshot, &req, now());
        for _ in 0..5 {
            assert_eq!(guard.evaluate_at(&snapshot, &req, now()), first);
        }
    }
}
