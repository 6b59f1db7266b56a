//! Start-up hydration of the session
//!
//! Runs once when the application mounts: reads the stored identity,
//! validates its token and seeds [`SessionState`]. Until it completes the
//! application shows a blocking loading view and renders nothing protected.
//!
//! Hydration always completes. A failing or panicking storage layer resolves
//! to "unauthenticated" with a best-effort clear of the stored record.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::state::SessionState;
use crate::auth::TokenInspector;
use crate::error::Result;
use crate::identity::Identity;
use crate::storage::SessionStore;

/// What hydration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// Hydration already ran (or is running); storage was not touched
    AlreadyHydrated,
    /// Nothing stored
    Empty,
    /// A valid identity was restored
    Restored,
    /// A stored identity failed validation and was cleared
    Discarded,
    /// Loading blew up; treated as unauthenticated
    Failed,
}

/// What the application shell should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateView {
    Loading,
    Ready,
}

/// Identity source whose reads may yield (async storage APIs)
#[async_trait]
pub trait AsyncIdentitySource: Send + Sync {
    async fn load(&self) -> Result<Option<Identity>>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl AsyncIdentitySource for SessionStore {
    async fn load(&self) -> Result<Option<Identity>> {
        Ok(SessionStore::load(self))
    }

    async fn clear(&self) -> Result<()> {
        SessionStore::clear(self);
        Ok(())
    }
}

/// Resolves the session before protected content renders
#[derive(Debug, Clone)]
pub struct HydrationGate {
    store: SessionStore,
    state: SessionState,
    inspector: TokenInspector,
    started: Arc<AtomicBool>,
}

impl HydrationGate {
    pub fn new(store: SessionStore, state: SessionState, inspector: TokenInspector) -> Self {
        Self {
            store,
            state,
            inspector,
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn view(&self) -> GateView {
        if self.state.is_hydrated() {
            GateView::Ready
        } else {
            GateView::Loading
        }
    }

    /// Hydrate from the synchronous session store
    pub fn run(&self) -> HydrationOutcome {
        if !self.claim() {
            return HydrationOutcome::AlreadyHydrated;
        }

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| self.resolve(self.store.load())));

        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Session hydration panicked, continuing unauthenticated");
                // The clear itself may be what panicked
                let _ = panic::catch_unwind(AssertUnwindSafe(|| self.store.clear()));
                self.state.set_hydrated(None);
                HydrationOutcome::Failed
            }
        };

        info!(outcome = ?outcome, "Session hydration complete");
        outcome
    }

    /// Hydrate from a source whose reads suspend
    ///
    /// The whole load, validate and clear sequence runs on its own task so a
    /// panic anywhere in it is contained like an error. The caller stays
    /// suspended, and the view stays `Loading`, until it resolves. A caller
    /// that arrives while another run is in flight waits for that run instead
    /// of reading storage again.
    pub async fn run_async(&self, source: Arc<dyn AsyncIdentitySource>) -> HydrationOutcome {
        if !self.claim() {
            self.state.wait_hydrated().await;
            return HydrationOutcome::AlreadyHydrated;
        }

        let inspector = self.inspector;
        let resolver = source.clone();
        let resolved = tokio::spawn(async move { resolve_async(resolver, inspector).await }).await;

        let outcome = match resolved {
            Ok(Resolution::Restored(identity)) => {
                self.state.set_hydrated(Some(identity));
                HydrationOutcome::Restored
            }
            Ok(Resolution::Empty) => {
                self.state.set_hydrated(None);
                HydrationOutcome::Empty
            }
            Ok(Resolution::Discarded) => {
                self.state.set_hydrated(None);
                HydrationOutcome::Discarded
            }
            Ok(Resolution::LoadFailed) => {
                self.state.set_hydrated(None);
                HydrationOutcome::Failed
            }
            Err(e) => {
                warn!(error = %e, "Session hydration task failed, continuing unauthenticated");
                clear_contained(source).await;
                self.state.set_hydrated(None);
                HydrationOutcome::Failed
            }
        };

        info!(outcome = ?outcome, "Session hydration complete");
        outcome
    }

    /// Take the single hydration slot; false if hydration ran or is running
    fn claim(&self) -> bool {
        !self.state.is_hydrated() && !self.started.swap(true, Ordering::SeqCst)
    }

    fn resolve(&self, record: Option<Identity>) -> HydrationOutcome {
        match record {
            Some(identity) => {
                if self.inspector.is_valid(Some(&identity)) {
                    self.state.set_hydrated(Some(identity));
                    HydrationOutcome::Restored
                } else {
                    info!(user_id = %identity.user_id, "Stored session is invalid, clearing");
                    self.store.clear();
                    self.state.set_hydrated(None);
                    HydrationOutcome::Discarded
                }
            }
            None => {
                self.state.set_hydrated(None);
                HydrationOutcome::Empty
            }
        }
    }
}

/// Result of the off-task half of `run_async`
enum Resolution {
    Restored(Identity),
    Empty,
    Discarded,
    LoadFailed,
}

async fn resolve_async(source: Arc<dyn AsyncIdentitySource>, inspector: TokenInspector) -> Resolution {
    let record = match source.load().await {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Session load failed, continuing unauthenticated");
            if let Err(e) = source.clear().await {
                warn!(error = %e, "Failed to clear session after load failure");
            }
            return Resolution::LoadFailed;
        }
    };

    match record {
        Some(identity) if inspector.is_valid(Some(&identity)) => Resolution::Restored(identity),
        Some(identity) => {
            info!(user_id = %identity.user_id, "Stored session is invalid, clearing");
            if let Err(e) = source.clear().await {
                warn!(error = %e, "Failed to clear invalid session");
            }
            Resolution::Discarded
        }
        None => Resolution::Empty,
    }
}

/// Best-effort clear after a failed run; the clear itself may panic
async fn clear_contained(source: Arc<dyn AsyncIdentitySource>) {
    match tokio::spawn(async move { source.clear().await }).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to clear session after hydration failure"),
        Err(e) => warn!(error = %e, "Clearing session after hydration failure panicked"),
    }
}
