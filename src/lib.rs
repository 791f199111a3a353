//! Workspace placeholder crate.
//!
//! Re-exports the service façade behind the default `desktop` feature so host
//! applications can depend on `player-workspace` alone.

#[cfg(feature = "desktop")]
pub use core_service::*;
