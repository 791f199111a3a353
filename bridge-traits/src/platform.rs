//! Thread-safety marker used by every bridge trait.
//!
//! Bridge implementations are shared behind `Arc` across async tasks, so
//! native targets require `Send + Sync`. Single-threaded hosts (wasm32) relax
//! the bound to nothing.

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}
