//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every core crate:
//! - Logging and tracing setup
//! - Configuration with fail-fast validation
//! - Event bus for decoupled notifications
//!
//! Other crates depend on this one for the conventions it establishes rather
//! than for any business logic.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
