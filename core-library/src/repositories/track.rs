//! Track repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{LoudnessStats, Track, TrackId, TrackRow};
use async_trait::async_trait;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

const TRACK_COLUMNS: &str = "id, display_name, artist, title, album_art, content_uri, \
     duration_ms, mime_type, integrated_loudness, loudness_range, true_peak";

/// Track repository interface for data access operations
#[async_trait]
pub trait TrackRepository: Send + Sync {
    /// All tracks ordered by display name (case-insensitive), then ID.
    async fn find_all(&self) -> Result<Vec<Track>>;

    /// Find a track by its ID
    ///
    /// # Returns
    /// - `Ok(Some(track))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: TrackId) -> Result<Option<Track>>;

    /// Resolve a list of IDs to tracks.
    ///
    /// The result follows the order of `ids`, repeats tracks whose ID appears
    /// more than once and skips IDs that are not in the library.
    async fn find_by_ids(&self, ids: &[TrackId]) -> Result<Vec<Track>>;

    /// Insert or refresh tracks in one transaction.
    ///
    /// Metadata columns are overwritten. Stored loudness is kept when the
    /// incoming track carries none.
    ///
    /// # Errors
    /// Returns `InvalidInput` if any track fails validation; nothing is
    /// written in that case.
    async fn upsert_many(&self, tracks: &[Track]) -> Result<()>;

    /// Overwrite the loudness measurements of a track.
    ///
    /// # Errors
    /// Returns `NotFound` if the track does not exist.
    async fn update_loudness_stats(&self, id: TrackId, stats: &LoudnessStats) -> Result<()>;

    /// Count total tracks
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of TrackRepository
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SQLite track repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackRepository for SqliteTrackRepository {
    async fn find_all(&self) -> Result<Vec<Track>> {
        let rows = query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM tracks ORDER BY display_name COLLATE NOCASE ASC, id ASC",
            TRACK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Track::from).collect())
    }

    async fn find_by_id(&self, id: TrackId) -> Result<Option<Track>> {
        let row = query_as::<_, TrackRow>(&format!(
            "SELECT {} FROM tracks WHERE id = ?",
            TRACK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Track::from))
    }

    async fn find_by_ids(&self, ids: &[TrackId]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM tracks WHERE id IN (", TRACK_COLUMNS));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<TrackRow>()
            .fetch_all(&self.pool)
            .await?;

        let by_id: HashMap<TrackId, Track> = rows
            .into_iter()
            .map(|row| {
                let track = Track::from(row);
                (track.id, track)
            })
            .collect();

        let tracks: Vec<Track> = ids.iter().filter_map(|id| by_id.get(id).cloned()).collect();
        if tracks.len() < ids.len() {
            debug!(
                requested = ids.len(),
                resolved = tracks.len(),
                "Some track IDs are not in the library"
            );
        }

        Ok(tracks)
    }

    async fn upsert_many(&self, tracks: &[Track]) -> Result<()> {
        for track in tracks {
            track.validate().map_err(|msg| LibraryError::InvalidInput {
                field: format!("track {}", track.id),
                message: msg,
            })?;
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for track in tracks {
            let stats = track.loudness;
            query(
                r#"
                INSERT INTO tracks (
                    id, display_name, artist, title, album_art, content_uri, duration_ms,
                    mime_type, integrated_loudness, loudness_range, true_peak,
                    created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    display_name = excluded.display_name,
                    artist = excluded.artist,
                    title = excluded.title,
                    album_art = excluded.album_art,
                    content_uri = excluded.content_uri,
                    duration_ms = excluded.duration_ms,
                    mime_type = excluded.mime_type,
                    integrated_loudness = COALESCE(excluded.integrated_loudness, tracks.integrated_loudness),
                    loudness_range = COALESCE(excluded.loudness_range, tracks.loudness_range),
                    true_peak = COALESCE(excluded.true_peak, tracks.true_peak),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(track.id)
            .bind(&track.display_name)
            .bind(&track.artist)
            .bind(&track.title)
            .bind(&track.album_art)
            .bind(&track.content_uri)
            .bind(track.duration_ms)
            .bind(&track.mime_type)
            .bind(stats.map(|s| s.integrated_loudness))
            .bind(stats.map(|s| s.loudness_range))
            .bind(stats.map(|s| s.true_peak))
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = tracks.len(), "Upserted tracks");

        Ok(())
    }

    async fn update_loudness_stats(&self, id: TrackId, stats: &LoudnessStats) -> Result<()> {
        let result = query(
            r#"
            UPDATE tracks
            SET integrated_loudness = ?, loudness_range = ?, true_peak = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(stats.integrated_loudness)
        .bind(stats.loudness_range)
        .bind(stats.true_peak)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("Track", id));
        }

        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM tracks")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
