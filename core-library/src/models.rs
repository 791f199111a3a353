//! Domain models for the music library
//!
//! Tracks come from the device media index and carry optional loudness
//! measurements. Playlists reference tracks by ID in a user-defined order.

use bridge_traits::ScannedAudio;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

/// Media-index identifier of a track
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TrackId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Auto-assigned playlist identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct PlaylistId(pub i64);

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PlaylistId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

// =============================================================================
// Loudness
// =============================================================================

/// EBU R128 measurements of one track.
///
/// Zero in every field is the "unknown" value produced when analysis fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoudnessStats {
    /// Integrated loudness in LUFS
    pub integrated_loudness: f32,
    /// Loudness range in LU
    pub loudness_range: f32,
    /// True peak in dBTP
    pub true_peak: f32,
}

impl LoudnessStats {
    pub fn new(integrated_loudness: f32, loudness_range: f32, true_peak: f32) -> Self {
        Self {
            integrated_loudness,
            loudness_range,
            true_peak,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.integrated_loudness == 0.0 && self.loudness_range == 0.0 && self.true_peak == 0.0
    }
}

// =============================================================================
// Track
// =============================================================================

/// A library track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// File display name, used for library ordering
    pub display_name: String,
    pub artist: String,
    pub title: String,
    /// Album art locator
    pub album_art: Option<String>,
    /// Locator handed to the engine and the analyzer
    pub content_uri: String,
    pub duration_ms: i64,
    pub mime_type: Option<String>,
    /// `None` until the track has been analyzed
    pub loudness: Option<LoudnessStats>,
}

impl Track {
    pub fn new(
        id: TrackId,
        display_name: impl Into<String>,
        content_uri: impl Into<String>,
        duration_ms: i64,
    ) -> Self {
        let display_name = display_name.into();
        Self {
            id,
            title: display_name.clone(),
            display_name,
            artist: String::new(),
            album_art: None,
            content_uri: content_uri.into(),
            duration_ms,
            mime_type: None,
            loudness: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_loudness(mut self, stats: LoudnessStats) -> Self {
        self.loudness = Some(stats);
        self
    }

    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.content_uri.trim().is_empty() {
            return Err("Content locator cannot be empty".to_string());
        }

        if self.duration_ms < 0 {
            return Err("Duration cannot be negative".to_string());
        }

        Ok(())
    }

    pub fn is_analyzed(&self) -> bool {
        self.loudness.is_some()
    }
}

impl From<ScannedAudio> for Track {
    fn from(audio: ScannedAudio) -> Self {
        Self {
            id: TrackId(audio.id),
            display_name: audio.display_name,
            artist: audio.artist,
            title: audio.title,
            album_art: audio.album_art,
            content_uri: audio.content_uri,
            duration_ms: audio.duration_ms,
            mime_type: Some(audio.mime_type),
            loudness: None,
        }
    }
}

/// Row shape of the `tracks` table.
#[derive(Debug, FromRow)]
pub(crate) struct TrackRow {
    pub id: i64,
    pub display_name: String,
    pub artist: String,
    pub title: String,
    pub album_art: Option<String>,
    pub content_uri: String,
    pub duration_ms: i64,
    pub mime_type: Option<String>,
    pub integrated_loudness: Option<f32>,
    pub loudness_range: Option<f32>,
    pub true_peak: Option<f32>,
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        let loudness = match (row.integrated_loudness, row.loudness_range, row.true_peak) {
            (Some(i), Some(lra), Some(tp)) => Some(LoudnessStats::new(i, lra, tp)),
            _ => None,
        };

        Self {
            id: TrackId(row.id),
            display_name: row.display_name,
            artist: row.artist,
            title: row.title,
            album_art: row.album_art,
            content_uri: row.content_uri,
            duration_ms: row.duration_ms,
            mime_type: row.mime_type,
            loudness,
        }
    }
}

// =============================================================================
// Playlist
// =============================================================================

/// A named, ordered list of track references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    /// Member IDs in play order; may reference tracks missing from the library
    pub track_ids: Vec<TrackId>,
    /// Creation time (Unix seconds)
    pub created_at: i64,
    /// Last membership change (Unix seconds)
    pub updated_at: i64,
}

impl Playlist {
    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        Self::validate_name(&self.name)
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PlaylistRow {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PlaylistRow {
    pub(crate) fn into_playlist(self, track_ids: Vec<TrackId>) -> Playlist {
        Playlist {
            id: PlaylistId(self.id),
            name: self.name,
            track_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Keeps the first occurrence of every ID, preserving order.
pub fn dedup_track_ids(ids: &[TrackId]) -> Vec<TrackId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
