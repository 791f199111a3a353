//! # Library Store
//!
//! SQLite pool holding the track library, loudness measurements and
//! playlists.
//!
//! The pool runs in WAL mode with foreign keys enforced, so deleting a
//! playlist drops its membership rows. Embedded migrations are applied before
//! the pool is handed out.
//!
//! ```rust,ignore
//! use core_library::{create_pool, DatabaseConfig, SqliteTrackRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("library.db")).await?;
//! let tracks = SqliteTrackRepository::new(pool.clone());
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Where the library lives and how many connections may touch it.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// sqlx connection URL
    pub database_url: String,
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// File-backed store; the file is created on first use.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        Self {
            database_url: format!("sqlite:{}", path.display()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Private in-memory store.
    ///
    /// Every in-memory connection opens its own database, so the pool is
    /// pinned to a single connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        if !self.is_in_memory() {
            self.max_connections = max.max(1);
        }
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url == IN_MEMORY_URL
    }
}

/// Open the store, apply migrations and verify one round trip.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening library store"
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true)
        .busy_timeout(config.busy_timeout);

    let mut pool_options = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections);
    if config.is_in_memory() {
        // Closing the last connection would drop the database.
        pool_options = pool_options.max_lifetime(None).idle_timeout(None);
    }

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        warn!(error = %e, "Failed to open library store");
        LibraryError::Database(e)
    })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            LibraryError::Migration(e.to_string())
        })?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;
    debug!("Library store ready");

    Ok(pool)
}

/// In-memory store with migrations applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}
