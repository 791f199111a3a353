//! # Host Bridge Traits
//!
//! Contracts between the player core and the host platform.
//!
//! ## Overview
//!
//! The core never talks to platform frameworks directly. Every capability it
//! needs from the host is expressed as a trait in this crate and injected at
//! startup. Each host ships concrete adapters; `bridge-desktop` provides the
//! desktop ones.
//!
//! ## Traits
//!
//! ### Playback
//! - [`AudioEngine`](playback::AudioEngine) - Play queue, transport controls, position queries
//! - [`LoudnessEnhancer`](playback::LoudnessEnhancer) - Hardware output gain effect
//!
//! ### Media
//! - [`MediaScanner`](media::MediaScanner) - One-shot enumeration of device audio files
//! - [`ContentResolver`](media::ContentResolver) - Bytes or local path behind a content locator
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Engine callbacks
//!
//! Engines report state through [`EngineEvent`](playback::EngineEvent) values
//! pushed into a channel registered with
//! [`AudioEngine::set_listener`](playback::AudioEngine::set_listener). The
//! core drains that channel from a single task, so implementations may send
//! from any thread.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert their native errors into it and include
//! enough context (locator, operation) to act on the message.
//!
//! ## Thread Safety
//!
//! Bridge traits require [`PlatformSendSync`](platform::PlatformSendSync) so
//! they can be shared behind `Arc` across async tasks.

pub mod error;
pub mod logging;
pub mod media;
pub mod platform;
pub mod playback;

pub use error::BridgeError;

pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{ContentResolver, MediaScanner, ScannedAudio};
pub use playback::{
    AudioEngine, EngineEvent, EngineEventReceiver, EngineEventSender, EngineState,
    LoudnessEnhancer, MediaItem,
};
