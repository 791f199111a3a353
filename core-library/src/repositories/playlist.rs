//! Playlist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{dedup_track_ids, Playlist, PlaylistId, PlaylistRow, TrackId};
use async_trait::async_trait;
use sqlx::{query, query_as, Sqlite, SqlitePool, Transaction};
use tracing::debug;

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Create a playlist with an initial, de-duplicated member list.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the name is blank.
    async fn create(&self, name: &str, track_ids: &[TrackId]) -> Result<Playlist>;

    /// All playlists in creation order, each with its ordered track IDs.
    async fn find_all(&self) -> Result<Vec<Playlist>>;

    /// Find a playlist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(playlist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: PlaylistId) -> Result<Option<Playlist>>;

    /// Append tracks after the current last position.
    ///
    /// The batch is de-duplicated first (first occurrence wins). IDs already
    /// in the playlist are appended again.
    ///
    /// # Errors
    /// Returns `NotFound` if the playlist does not exist.
    async fn add_tracks(&self, id: PlaylistId, track_ids: &[TrackId]) -> Result<()>;

    /// Remove every occurrence of a track and close the gaps.
    ///
    /// # Returns
    /// - `Ok(true)` if at least one entry was removed
    /// - `Ok(false)` if the track was not in the playlist
    async fn remove_track(&self, id: PlaylistId, track_id: TrackId) -> Result<bool>;

    /// Get track IDs in a playlist (ordered by position)
    async fn get_track_ids(&self, id: PlaylistId) -> Result<Vec<TrackId>>;

    /// Count total playlists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    /// Create a new SqlitePlaylistRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_track_ids<'e, E>(executor: E, id: PlaylistId) -> Result<Vec<TrackId>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let track_ids = query_as::<_, (TrackId,)>(
            "SELECT track_id FROM playlist_tracks WHERE playlist_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(executor)
        .await
        .map(|rows| rows.into_iter().map(|(track_id,)| track_id).collect())?;

        Ok(track_ids)
    }

    async fn append(
        tx: &mut Transaction<'_, Sqlite>,
        id: PlaylistId,
        track_ids: &[TrackId],
    ) -> Result<()> {
        let next: i64 = query_as(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_tracks WHERE playlist_id = ?",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map(|row: (i64,)| row.0)?;

        for (offset, track_id) in track_ids.iter().enumerate() {
            query("INSERT INTO playlist_tracks (playlist_id, position, track_id) VALUES (?, ?, ?)")
                .bind(id)
                .bind(next + offset as i64)
                .bind(*track_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    async fn touch(tx: &mut Transaction<'_, Sqlite>, id: PlaylistId) -> Result<bool> {
        let result = query("UPDATE playlists SET updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn create(&self, name: &str, track_ids: &[TrackId]) -> Result<Playlist> {
        Playlist::validate_name(name).map_err(|e| LibraryError::InvalidInput {
            field: "name".to_string(),
            message: e,
        })?;

        let now = chrono::Utc::now().timestamp();
        let members = dedup_track_ids(track_ids);
        let mut tx = self.pool.begin().await?;

        let result = query("INSERT INTO playlists (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        let id = PlaylistId(result.last_insert_rowid());

        Self::append(&mut tx, id, &members).await?;
        tx.commit().await?;

        debug!(playlist_id = %id, tracks = members.len(), "Created playlist");

        Ok(Playlist {
            id,
            name: name.to_string(),
            track_ids: members,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_all(&self) -> Result<Vec<Playlist>> {
        let rows = query_as::<_, PlaylistRow>(
            "SELECT id, name, created_at, updated_at FROM playlists ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut playlists = Vec::with_capacity(rows.len());
        for row in rows {
            let track_ids = Self::load_track_ids(&self.pool, PlaylistId(row.id)).await?;
            playlists.push(row.into_playlist(track_ids));
        }

        Ok(playlists)
    }

    async fn find_by_id(&self, id: PlaylistId) -> Result<Option<Playlist>> {
        let row = query_as::<_, PlaylistRow>(
            "SELECT id, name, created_at, updated_at FROM playlists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let track_ids = Self::load_track_ids(&self.pool, id).await?;
                Ok(Some(row.into_playlist(track_ids)))
            }
            None => Ok(None),
        }
    }

    async fn add_tracks(&self, id: PlaylistId, track_ids: &[TrackId]) -> Result<()> {
        let batch = dedup_track_ids(track_ids);
        let mut tx = self.pool.begin().await?;

        if !Self::touch(&mut tx, id).await? {
            return Err(LibraryError::not_found("Playlist", id));
        }

        Self::append(&mut tx, id, &batch).await?;
        tx.commit().await?;

        debug!(playlist_id = %id, added = batch.len(), "Added tracks to playlist");
        Ok(())
    }

    async fn remove_track(&self, id: PlaylistId, track_id: TrackId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = query("DELETE FROM playlist_tracks WHERE playlist_id = ? AND track_id = ?")
            .bind(id)
            .bind(track_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        // Rewrite positions as 0..n so appends stay contiguous.
        let remaining = Self::load_track_ids(&mut *tx, id).await?;
        query("DELETE FROM playlist_tracks WHERE playlist_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::append(&mut tx, id, &remaining).await?;
        Self::touch(&mut tx, id).await?;

        tx.commit().await?;

        debug!(
            playlist_id = %id,
            track_id = %track_id,
            removed = result.rows_affected(),
            "Removed track from playlist"
        );
        Ok(true)
    }

    async fn get_track_ids(&self, id: PlaylistId) -> Result<Vec<TrackId>> {
        Self::load_track_ids(&self.pool, id).await
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM playlists")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
