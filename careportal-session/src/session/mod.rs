//! Session lifecycle: in-memory state, start-up hydration, login/logout

pub mod actions;
pub mod hydration;
pub mod state;

pub use actions::SessionActions;
pub use hydration::{AsyncIdentitySource, GateView, HydrationGate, HydrationOutcome};
pub use state::{SessionSnapshot, SessionState};
