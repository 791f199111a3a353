//! # Event Bus System
//!
//! Typed, broadcast-based notifications between the player core and its
//! observers.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: `CoreEvent` wrapping library, playback and normalization events
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ```text
//! ┌───────────────┐    emit     ┌───────────┐
//! │ Library flows ├────────────>│           │    subscribe    ┌────────────┐
//! └───────────────┘             │ EventBus  ├────────────────>│ Subscriber │
//! ┌───────────────┐    emit     │ (broadcast│                 └────────────┘
//! │ State machine ├────────────>│  channel) │    subscribe    ┌────────────┐
//! └───────────────┘             │           ├────────────────>│ Subscriber │
//! ┌───────────────┐    emit     │           │                 └────────────┘
//! │ Normalization ├────────────>│           │
//! └───────────────┘             └───────────┘
//! ```
//!
//! The bus carries discrete notifications. Continuously changing state
//! (position, current track, screen state) is published through `watch`
//! channels owned by the components that hold it, so late observers always
//! see the latest value.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Library(LibraryEvent::LibraryLoaded {
//!         track_count: 12,
//!         from_cache: false,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Library loaded");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns `Err(SendError)`; publishers in this
//! workspace ignore it.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

pub use crate::config::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Library and playlist storage events
    Library(LibraryEvent),
    /// Player state machine events
    Playback(PlaybackEvent),
    /// Loudness analysis and gain events
    Normalization(NormalizationEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Normalization(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Library(LibraryEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Normalization(NormalizationEvent::AnalysisFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Library(LibraryEvent::LibraryLoaded { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::PlaylistCreated { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::PlaylistLoaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to the persisted library and playlists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Track list is available, either from storage or a fresh scan
    LibraryLoaded { track_count: usize, from_cache: bool },
    PlaylistCreated { playlist_id: i64, name: String },
    /// `change_type` is `"tracks_added"` or `"track_removed"`
    PlaylistUpdated {
        playlist_id: i64,
        change_type: String,
    },
    /// Scanning or reading the library failed
    LoadFailed { message: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::LibraryLoaded { .. } => "Library loaded",
            LibraryEvent::PlaylistCreated { .. } => "Playlist created",
            LibraryEvent::PlaylistUpdated { .. } => "Playlist updated",
            LibraryEvent::LoadFailed { .. } => "Library load failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new play queue was handed to the engine
    PlaylistLoaded { track_count: usize },
    /// The user picked a queue entry
    TrackSelected { index: usize, track_id: i64 },
    PlayingChanged { is_playing: bool },
    /// Engine and enhancer were released
    Released,
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::PlaylistLoaded { .. } => "Playlist loaded",
            PlaybackEvent::TrackSelected { .. } => "Track selected",
            PlaybackEvent::PlayingChanged { .. } => "Playing state changed",
            PlaybackEvent::Released => "Player released",
        }
    }
}

// ============================================================================
// Normalization Events
// ============================================================================

/// Events emitted while measuring loudness and applying gain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum NormalizationEvent {
    TrackAnalyzed {
        track_id: i64,
        integrated_loudness: f32,
        loudness_range: f32,
        true_peak: f32,
    },
    AnalysisFailed { track_id: i64, message: String },
    /// Gain in dB handed to the enhancer
    GainApplied { track_id: i64, gain_db: f32 },
}

impl NormalizationEvent {
    fn description(&self) -> &str {
        match self {
            NormalizationEvent::TrackAnalyzed { .. } => "Track loudness analyzed",
            NormalizationEvent::AnalysisFailed { .. } => "Track loudness analysis failed",
            NormalizationEvent::GainApplied { .. } => "Normalization gain applied",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another producer on the same channel; each
/// `subscribe()` creates an independent receiver.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers falling more than `capacity` events behind receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let normalization_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Normalization(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
