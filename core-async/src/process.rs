//! Child process spawning.
//!
//! Used by analysis components that shell out to external tools. Every
//! child is awaited to completion by its caller; nothing here keeps a
//! process pool alive.

pub use std::process::{ExitStatus, Output, Stdio};
pub use tokio::process::{Child, Command};
