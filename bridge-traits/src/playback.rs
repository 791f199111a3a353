//! Playback bridge traits and supporting types.
//!
//! The host platform owns the actual audio engine and the hardware loudness
//! effect. The core drives both through the traits below and receives engine
//! notifications over a channel registered with [`AudioEngine::set_listener`].
//!
//! Engine callbacks usually fire on the engine's own thread. Implementations
//! must only push [`EngineEvent`] values into the registered sender and never
//! call back into the core directly; the core drains the channel from a single
//! task so all state changes happen in emission order.

use crate::{error::Result, platform::PlatformSendSync};
use core_async::sync::mpsc;
use serde::{Deserialize, Serialize};

/// Coarse engine lifecycle reported through [`EngineEvent::PlaybackStateChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    /// No media loaded or the engine was stopped.
    Idle,
    /// Waiting for data before playback can continue.
    Buffering,
    /// Media is loaded and duration is known.
    Ready,
    /// The last item finished playing.
    Ended,
}

/// Notification emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine moved to a new lifecycle state.
    PlaybackStateChanged(EngineState),
    /// The engine started or stopped producing audio.
    IsPlayingChanged(bool),
}

/// Sending half handed to the engine for its callbacks.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half drained by the playback core.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Creates a callback channel pair for an engine listener.
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// One entry of the engine's play queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Stable identifier, typically the track ID.
    pub media_id: String,
    /// Content locator the engine opens.
    pub uri: String,
    /// Display title surfaced to media sessions.
    pub title: Option<String>,
    /// Display artist surfaced to media sessions.
    pub artist: Option<String>,
}

impl MediaItem {
    pub fn new(media_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            uri: uri.into(),
            title: None,
            artist: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }
}

/// Contract over the platform audio engine.
///
/// Commands are fire-and-forget from the core's point of view: an `Err` is
/// logged and playback state is left to the engine's callbacks. Positions and
/// durations are in milliseconds.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioEngine: PlatformSendSync {
    /// Register the channel that receives engine callbacks, replacing any
    /// previous listener.
    fn set_listener(&self, listener: EngineEventSender);

    /// Detach the registered listener.
    fn clear_listener(&self);

    /// Replace the play queue.
    async fn set_media_items(&self, items: Vec<MediaItem>) -> Result<()>;

    /// Drop every queued item.
    async fn clear_media_items(&self) -> Result<()>;

    /// Acquire decoding resources for the current queue.
    async fn prepare(&self) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Seek within the current item.
    async fn seek_to(&self, position_ms: i64) -> Result<()>;

    /// Jump to `index` in the queue at `position_ms`.
    async fn seek_to_item(&self, index: usize, position_ms: i64) -> Result<()>;

    /// Jump to `index` at the item's default start position.
    async fn seek_to_default_position(&self, index: usize) -> Result<()>;

    async fn seek_to_next_item(&self) -> Result<()>;

    /// Coarse relative seek forward by the engine's configured increment.
    async fn seek_forward(&self) -> Result<()>;

    /// Coarse relative seek back by the engine's configured increment.
    async fn seek_back(&self) -> Result<()>;

    async fn current_position_ms(&self) -> Result<i64>;

    /// Duration of the current item, `None` while unknown.
    async fn duration_ms(&self) -> Result<Option<i64>>;

    async fn current_index(&self) -> Result<usize>;

    async fn is_playing(&self) -> Result<bool>;

    /// Release the engine. Further calls may fail with `BridgeError::Released`.
    async fn release(&self) -> Result<()>;
}

/// Hardware loudness-enhancement effect attached to the engine's output.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait LoudnessEnhancer: PlatformSendSync {
    async fn set_enabled(&self, enabled: bool) -> Result<()>;

    /// Set the output gain in decibels. Negative values attenuate.
    async fn set_target_gain(&self, gain_db: f32) -> Result<()>;

    async fn release(&self) -> Result<()>;
}
