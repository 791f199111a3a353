//! # Core Configuration Module
//!
//! Provides configuration management for the player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the storage locations, normalization parameters and optional host
//! bridges. Validation is fail-fast: `build()` refuses to hand out a config
//! that the playback core could not run with.
//!
//! ## Required Settings
//!
//! - `database_path` - SQLite file holding the library and playlists
//! - `cache_dir` - Scratch directory for loudness-analysis copies
//!
//! ## Optional Bridges
//!
//! - `MediaScanner` - Device audio index (desktop default: directory walker)
//! - `ContentResolver` - Locator to bytes/path resolution (desktop default: local files)
//! - `LoggerSink` - Host log pipeline
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .cache_dir("/path/to/cache")
//!     .target_loudness_lufs(-16.0)
//!     .progress_interval(Duration::from_millis(250))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.max_gain_db, 15.0);
//! ```
//!
//! ## Error Handling
//!
//! Missing required settings produce an error naming the setter to call:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .build()
//!     .expect("Should fail - missing cache directory");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{ContentResolver, LoggerSink, MediaScanner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default integrated-loudness target in LUFS.
pub const DEFAULT_TARGET_LOUDNESS_LUFS: f32 = -14.0;

/// Default bound on the applied gain in dB, in both directions.
pub const DEFAULT_MAX_GAIN_DB: f32 = 15.0;

/// Default playback progress sampling period.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Default wall-clock limit for one loudness analysis.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(120);

/// Default capacity of the event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Directory for temporary analysis copies
    pub cache_dir: PathBuf,

    /// ffmpeg executable name or path
    pub ffmpeg_path: PathBuf,

    /// Integrated loudness every track is normalized towards (LUFS)
    pub target_loudness_lufs: f32,

    /// Absolute bound on the gain handed to the enhancer (dB)
    pub max_gain_db: f32,

    /// How often the playback position is sampled while playing
    pub progress_interval: Duration,

    /// Limit for a single ffmpeg loudness run
    pub analysis_timeout: Duration,

    /// Capacity of the broadcast event bus
    pub event_buffer_size: usize,

    pub media_scanner: Option<Arc<dyn MediaScanner>>,

    pub content_resolver: Option<Arc<dyn ContentResolver>>,

    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("cache_dir", &self.cache_dir)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("target_loudness_lufs", &self.target_loudness_lufs)
            .field("max_gain_db", &self.max_gain_db)
            .field("progress_interval", &self.progress_interval)
            .field("analysis_timeout", &self.analysis_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "media_scanner",
                &self.media_scanner.as_ref().map(|_| "MediaScanner { ... }"),
            )
            .field(
                "content_resolver",
                &self
                    .content_resolver
                    .as_ref()
                    .map(|_| "ContentResolver { ... }"),
            )
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path and cache directory are not empty
    /// - ffmpeg path is not empty
    /// - Target loudness is finite and not above 0 LUFS
    /// - Max gain is finite and positive
    /// - Progress interval, analysis timeout and event buffer are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(Error::Config("ffmpeg path cannot be empty".to_string()));
        }

        if !self.target_loudness_lufs.is_finite() || self.target_loudness_lufs > 0.0 {
            return Err(Error::Config(format!(
                "Target loudness must be a finite value at or below 0 LUFS, got {}",
                self.target_loudness_lufs
            )));
        }

        if !self.max_gain_db.is_finite() || self.max_gain_db <= 0.0 {
            return Err(Error::Config(format!(
                "Max gain must be a positive number of dB, got {}",
                self.max_gain_db
            )));
        }

        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "Progress interval must be greater than 0ms".to_string(),
            ));
        }

        if self.analysis_timeout.is_zero() {
            return Err(Error::Config(
                "Analysis timeout must be greater than 0s".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the media scanner or a [`Error::CapabilityMissing`] naming it.
    pub fn require_media_scanner(&self) -> Result<Arc<dyn MediaScanner>> {
        self.media_scanner
            .clone()
            .ok_or_else(|| Error::CapabilityMissing {
                capability: "MediaScanner".to_string(),
                message: "A MediaScanner is required to index device audio. \
                          Desktop: use bridge_desktop::DirectoryMediaScanner. \
                          Mobile: inject the platform media index."
                    .to_string(),
            })
    }

    /// Returns the content resolver or a [`Error::CapabilityMissing`] naming it.
    pub fn require_content_resolver(&self) -> Result<Arc<dyn ContentResolver>> {
        self.content_resolver
            .clone()
            .ok_or_else(|| Error::CapabilityMissing {
                capability: "ContentResolver".to_string(),
                message: "A ContentResolver is required for loudness analysis. \
                          Desktop: use bridge_desktop::FileContentResolver. \
                          Mobile: inject the platform content resolver."
                    .to_string(),
            })
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once the required settings are
/// provided; unset optional values fall back to the `DEFAULT_*` constants.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    ffmpeg_path: Option<PathBuf>,
    target_loudness_lufs: Option<f32>,
    max_gain_db: Option<f32>,
    progress_interval: Option<Duration>,
    analysis_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    media_scanner: Option<Arc<dyn MediaScanner>>,
    content_resolver: Option<Arc<dyn ContentResolver>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/library.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the cache directory used for temporary analysis copies.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the ffmpeg executable.
    ///
    /// Default: `ffmpeg` resolved through `PATH`
    pub fn ffmpeg_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Sets the normalization target.
    ///
    /// Default: -14 LUFS
    pub fn target_loudness_lufs(mut self, lufs: f32) -> Self {
        self.target_loudness_lufs = Some(lufs);
        self
    }

    /// Sets the gain bound.
    ///
    /// Default: 15 dB
    pub fn max_gain_db(mut self, db: f32) -> Self {
        self.max_gain_db = Some(db);
        self
    }

    /// Default: 500 ms
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Default: 120 s
    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }

    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn media_scanner(mut self, scanner: Arc<dyn MediaScanner>) -> Self {
        self.media_scanner = Some(scanner);
        self
    }

    pub fn content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content_resolver = Some(resolver);
        self
    }

    /// Sets the host log sink forwarded to `init_logging`.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required setting is missing or a value
    /// fails [`CoreConfig::validate`].
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let config = CoreConfig {
            database_path,
            cache_dir,
            ffmpeg_path: self.ffmpeg_path.unwrap_or_else(|| PathBuf::from("ffmpeg")),
            target_loudness_lufs: self
                .target_loudness_lufs
                .unwrap_or(DEFAULT_TARGET_LOUDNESS_LUFS),
            max_gain_db: self.max_gain_db.unwrap_or(DEFAULT_MAX_GAIN_DB),
            progress_interval: self.progress_interval.unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            analysis_timeout: self.analysis_timeout.unwrap_or(DEFAULT_ANALYSIS_TIMEOUT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            media_scanner: self.media_scanner,
            content_resolver: self.content_resolver,
            logger_sink: self.logger_sink,
        };

        config.validate()?;

        Ok(config)
    }
}
