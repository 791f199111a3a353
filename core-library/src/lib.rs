//! # Library Management Module
//!
//! Owns the track library database and provides repositories for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database pool and embedded migrations
//! - Track storage, including per-track loudness measurements
//! - Playlists as ordered lists of track references

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{LoudnessStats, Playlist, PlaylistId, Track, TrackId};
pub use repositories::{
    PlaylistRepository, SqlitePlaylistRepository, SqliteTrackRepository, TrackRepository,
};
