//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository so callers can be
//!   tested against mocks
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `TrackRepository` - Library tracks and their loudness measurements
//! - `PlaylistRepository` - Named playlists with ordered track membership

pub mod playlist;
pub mod track;

pub use playlist::{PlaylistRepository, SqlitePlaylistRepository};
pub use track::{SqliteTrackRepository, TrackRepository};
