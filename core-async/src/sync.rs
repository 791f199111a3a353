//! Synchronization primitives.
//!
//! Channels and locks come straight from `tokio::sync`; cancellation tokens
//! come from `tokio-util`.

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore,
};

pub use tokio_util::sync::{CancellationToken, DropGuard};
