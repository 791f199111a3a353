//! Time-related operations.
//!
//! Re-exports `tokio::time` so that tests can drive timers with a paused
//! clock (`#[tokio::test(start_paused = true)]`).

pub use tokio::time::{
    error::Elapsed, interval, interval_at, sleep, sleep_until, timeout, Interval,
    MissedTickBehavior, Sleep, Timeout,
};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::Instant;
