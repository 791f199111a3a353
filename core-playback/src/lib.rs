//! # Playback & Normalization Core
//!
//! Drives the host audio engine and its loudness effect.
//!
//! ## Overview
//!
//! This crate handles:
//! - Loudness measurement of tracks through an external `ffmpeg` pass
//! - Dynamic gain calculation from the measured statistics
//! - Applying that gain to the engine's loudness enhancer
//! - The playback state machine reconciling user intents with engine callbacks
//!
//! All engine access and state changes happen on one task owned by
//! [`PlaybackStateMachine`]; observers receive updates through `watch` and
//! `broadcast` channels.

pub mod error;
pub mod gain;
pub mod loudness;
pub mod machine;
pub mod state;

pub use error::{PlaybackError, Result};
pub use gain::{calculate_dynamic_gain, GainController, DEFAULT_MAX_GAIN, DEFAULT_TARGET_LOUDNESS};
pub use loudness::{parse_loudnorm_output, AnalyzerConfig, LoudnessAnalyzer, TrackAnalyzer};
pub use machine::{PlaybackSettings, PlaybackStateMachine};
pub use state::{
    compute_progress, format_duration, MusicState, PlaybackSnapshot, PlaybackStatus, PlayerIntent,
};
