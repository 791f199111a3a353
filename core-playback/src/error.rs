//! # Playback Error Types
//!
//! Error types for loudness analysis and the playback session.

use bridge_traits::error::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during analysis or playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Analysis Errors
    // ========================================================================
    /// The analysis tool could not be started (missing binary, permissions).
    #[error("Failed to launch analysis tool '{tool}': {source}")]
    AnalyzerLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The analysis tool exited with a failure status.
    #[error("Analysis failed with {status}: {stderr_tail}")]
    AnalysisFailed { status: String, stderr_tail: String },

    /// The analysis tool ran longer than the configured limit.
    #[error("Analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),

    /// The tool output did not contain a loudness summary.
    #[error("No loudness summary in analysis output")]
    MissingLoudnessSummary,

    /// The track's content could not be read or materialized.
    #[error("Track content unavailable: {0}")]
    ContentUnavailable(String),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// A bridge call into the audio engine or enhancer failed.
    #[error("Engine error: {0}")]
    Engine(#[from] BridgeError),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The playback session was released; no further commands are accepted.
    #[error("Playback session closed")]
    SessionClosed,

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlaybackError {
    /// Returns `true` if the error came out of loudness analysis.
    pub fn is_analysis_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::AnalyzerLaunch { .. }
                | PlaybackError::AnalysisFailed { .. }
                | PlaybackError::AnalysisTimeout(_)
                | PlaybackError::MissingLoudnessSummary
                | PlaybackError::ContentUnavailable(_)
        )
    }

    /// Returns `true` if the session no longer accepts commands.
    pub fn is_session_closed(&self) -> bool {
        matches!(self, PlaybackError::SessionClosed)
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
