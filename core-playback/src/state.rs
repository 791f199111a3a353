//! Playback state types shared by the state machine and its observers.

use bridge_traits::EngineState;
use serde::{Deserialize, Serialize};

/// User intent delivered to the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerIntent {
    /// Toggle on the engine's current playing flag.
    PlayPause,
    /// Select an entry of the active list; taken modulo the list length.
    SelectedAudioChange(i64),
    /// Seek to a percentage (0..=100) of the current item.
    SeekTo(f32),
    /// Like `SeekTo`, and publish the new progress right away.
    UpdateProgress(f32),
    SeekToNext,
    /// Coarse relative seek backwards.
    Backward,
    /// Coarse relative seek forwards.
    Forward,
    /// Stop progress polling and mark playback as not playing.
    Stop,
}

/// Raw state stream entry, published in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicState {
    Idle,
    /// Engine is ready; duration of the current item (0 when unknown).
    Ready { duration_ms: i64 },
    /// Periodic position sample while playing.
    InProgress { position_ms: i64 },
    Buffering { position_ms: i64 },
    Playing(bool),
    /// Engine's current queue index.
    CurrentPlaying(usize),
}

/// Coarse status shown by player UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// Nothing loaded.
    Idle,
    Buffering,
    Playing,
    /// A list is loaded and the engine is not playing.
    Paused,
    /// The engine played past the last item.
    Ended,
}

/// Latest known playback session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub engine_status: EngineState,
    pub is_playing: bool,
    pub current_index: usize,
    pub position_ms: i64,
    /// `None` until the engine reports a positive duration.
    pub duration_ms: Option<i64>,
    /// Always within `0.0..=100.0`.
    pub progress_percent: f32,
    pub track_count: usize,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            engine_status: EngineState::Idle,
            is_playing: false,
            current_index: 0,
            position_ms: 0,
            duration_ms: None,
            progress_percent: 0.0,
            track_count: 0,
        }
    }
}

impl PlaybackSnapshot {
    /// Fresh session state for a newly loaded list of `track_count` entries.
    pub fn loaded(track_count: usize) -> Self {
        Self {
            track_count,
            ..Self::default()
        }
    }

    /// Fold one state stream entry into the snapshot.
    pub fn apply(&mut self, state: &MusicState) {
        match *state {
            MusicState::Idle => {
                self.engine_status = EngineState::Idle;
            }
            MusicState::Ready { duration_ms } => {
                self.engine_status = EngineState::Ready;
                self.duration_ms = (duration_ms > 0).then_some(duration_ms);
                self.progress_percent = compute_progress(self.position_ms, self.duration_ms);
            }
            MusicState::InProgress { position_ms } => {
                self.position_ms = position_ms;
                self.progress_percent = compute_progress(position_ms, self.duration_ms);
            }
            MusicState::Buffering { position_ms } => {
                self.engine_status = EngineState::Buffering;
                self.position_ms = position_ms;
                self.progress_percent = compute_progress(position_ms, self.duration_ms);
            }
            MusicState::Playing(playing) => {
                self.is_playing = playing;
            }
            MusicState::CurrentPlaying(index) => {
                self.current_index = index;
            }
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.is_playing {
            return PlaybackStatus::Playing;
        }

        match self.engine_status {
            EngineState::Buffering => PlaybackStatus::Buffering,
            EngineState::Ended => PlaybackStatus::Ended,
            EngineState::Ready | EngineState::Idle if self.track_count > 0 => {
                PlaybackStatus::Paused
            }
            EngineState::Ready | EngineState::Idle => PlaybackStatus::Idle,
        }
    }

    /// Current position as `mm:ss`.
    pub fn position_label(&self) -> String {
        format_duration(self.position_ms)
    }

    /// Duration as `mm:ss`, `00:00` while unknown.
    pub fn duration_label(&self) -> String {
        format_duration(self.duration_ms.unwrap_or(0))
    }
}

/// Progress percentage of `position_ms` within `duration_ms`, clamped to
/// `0.0..=100.0`. Unknown or zero duration yields 0.
pub fn compute_progress(position_ms: i64, duration_ms: Option<i64>) -> f32 {
    match duration_ms {
        Some(duration) if duration > 0 => {
            (position_ms as f32 / duration as f32 * 100.0).clamp(0.0, 100.0)
        }
        _ => 0.0,
    }
}

/// Formats milliseconds as `mm:ss`. Negative values render as `00:00`.
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
