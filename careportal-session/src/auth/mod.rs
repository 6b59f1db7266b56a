//! Authentication primitives for the portal client
//!
//! Provides:
//! - Bearer token inspection (structure and expiry, no signature check)
//! - Portal roles

pub mod roles;
pub mod token;

pub use roles::Role;
pub use token::{TokenClaims, TokenInspector};
