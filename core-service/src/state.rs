//! Observable state published by [`CoreService`](crate::CoreService).

use core_library::Track;
use core_playback::PlayerIntent;
use serde::{Deserialize, Serialize};

/// Player controls as emitted by host UIs.
pub type PlayerUiEvent = PlayerIntent;

/// Library loading state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum UiState {
    /// No load attempted yet.
    #[default]
    Idle,
    Loading,
    Success(Vec<Track>),
    Error(String),
}

impl UiState {
    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }

    /// Tracks of a successful load.
    pub fn tracks(&self) -> Option<&[Track]> {
        match self {
            UiState::Success(tracks) => Some(tracks),
            _ => None,
        }
    }
}
