//! CarePortal session core
//!
//! Client-side authentication and session validity for the CarePortal
//! healthcare portal (patients, doctors, admins).
//!
//! ## Components
//!
//! - **Token inspection**: structural and expiry checks on bearer tokens
//! - **Session store**: the persisted identity record in client storage
//! - **Session state**: reactive in-memory `{identity, hydrated}`
//! - **Hydration gate**: resolves the session once at start-up
//! - **Route guard**: authentication and role checks on every route entry
//! - **Meeting hand-off**: Zoom/Jitsi link parsing and SDK adapter
//!
//! Control flow: app start → hydration → guard on each navigation → render.

pub mod auth;
pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod meeting;
pub mod routing;
pub mod session;
pub mod storage;
pub mod theme;

pub use auth::{Role, TokenInspector};
pub use config::PortalConfig;
pub use context::PortalContext;
pub use error::{PortalError, Result};
pub use identity::Identity;
