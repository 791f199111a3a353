//! Async abstraction layer for the player core.
//!
//! All core crates depend on this crate instead of reaching into tokio
//! directly. It re-exports the runtime primitives the core needs and adds a
//! small number of helpers built on top of them.
//!
//! # Modules
//!
//! - `task`: Task spawning and execution
//! - `time`: Sleep, intervals, timeouts
//! - `sync`: Channels, locks and cancellation
//! - `process`: Child process spawning for external analysis tools
//! - `fs`: Async filesystem helpers
//! - `periodic`: Cancellable repeating task handle
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod fs;
pub mod periodic;
pub mod process;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use periodic::PeriodicTask;
pub use tokio::select;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
