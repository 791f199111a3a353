//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (audio engine, loudness effect,
//! media scanner, content resolver) and the SQLite library store into one
//! [`CoreService`] that player UIs drive. Desktop apps typically enable the
//! `desktop` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`]; other hosts inject their own scanner and resolver
//! through [`CoreConfig`] and call [`bootstrap`].

pub mod error;
pub mod normalization;
pub mod service;
pub mod state;

pub use error::{CoreError, Result};
pub use normalization::{NormalizationReport, PlaylistNormalizationFlow};
pub use service::CoreService;
pub use state::{PlayerUiEvent, UiState};

use std::sync::Arc;

use bridge_traits::{AudioEngine, LoudnessEnhancer, MediaScanner};
use core_library::{
    create_pool, DatabaseConfig, PlaylistRepository, SqlitePlaylistRepository,
    SqliteTrackRepository, TrackRepository,
};
use core_playback::{AnalyzerConfig, LoudnessAnalyzer, TrackAnalyzer};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use tracing::info;

/// Aggregated handle to everything the service needs.
#[derive(Clone)]
pub struct CoreDependencies {
    pub tracks: Arc<dyn TrackRepository>,
    pub playlists: Arc<dyn PlaylistRepository>,
    pub scanner: Arc<dyn MediaScanner>,
    pub analyzer: Arc<dyn TrackAnalyzer>,
    pub engine: Arc<dyn AudioEngine>,
    pub enhancer: Arc<dyn LoudnessEnhancer>,
    pub event_bus: EventBus,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit handles.
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        playlists: Arc<dyn PlaylistRepository>,
        scanner: Arc<dyn MediaScanner>,
        analyzer: Arc<dyn TrackAnalyzer>,
        engine: Arc<dyn AudioEngine>,
        enhancer: Arc<dyn LoudnessEnhancer>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            tracks,
            playlists,
            scanner,
            analyzer,
            engine,
            enhancer,
            event_bus,
        }
    }
}

/// Build a [`CoreService`] backed by the SQLite store at
/// `config.database_path` and the ffmpeg loudness analyzer.
///
/// The config must carry a media scanner and a content resolver; a missing
/// one fails with [`CoreError::CapabilityMissing`].
pub async fn bootstrap(
    config: CoreConfig,
    engine: Arc<dyn AudioEngine>,
    enhancer: Arc<dyn LoudnessEnhancer>,
) -> Result<CoreService> {
    config.validate()?;
    let scanner = config.require_media_scanner()?;
    let resolver = config.require_content_resolver()?;

    let pool = create_pool(DatabaseConfig::new(&config.database_path))
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let analyzer = LoudnessAnalyzer::new(AnalyzerConfig::from_core_config(&config), resolver);

    let deps = CoreDependencies::new(
        Arc::new(SqliteTrackRepository::new(pool.clone())),
        Arc::new(SqlitePlaylistRepository::new(pool)),
        scanner,
        Arc::new(analyzer),
        engine,
        enhancer,
        EventBus::new(config.event_buffer_size),
    );

    info!(database = %config.database_path.display(), "Core service bootstrapped");
    Ok(CoreService::new(deps, &config))
}

/// Convenience bootstrapper for desktop hosts.
///
/// Fills in a [`DirectoryMediaScanner`](bridge_desktop::DirectoryMediaScanner)
/// over `music_dirs` and a
/// [`FileContentResolver`](bridge_desktop::FileContentResolver) unless the
/// config already carries its own.
///
/// ```no_run
/// # #[cfg(feature = "desktop")]
/// # async fn example(
/// #     engine: std::sync::Arc<dyn bridge_traits::AudioEngine>,
/// #     enhancer: std::sync::Arc<dyn bridge_traits::LoudnessEnhancer>,
/// # ) -> core_service::Result<()> {
/// use core_runtime::config::CoreConfig;
/// use core_service::bootstrap_desktop;
///
/// let config = CoreConfig::builder()
///     .database_path("/tmp/player.db")
///     .cache_dir("/tmp/player-cache")
///     .build()?;
/// let core = bootstrap_desktop(config, vec!["/home/me/Music".into()], engine, enhancer).await?;
/// core.load_music_if_needed().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(all(feature = "desktop", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(
    mut config: CoreConfig,
    music_dirs: Vec<std::path::PathBuf>,
    engine: Arc<dyn AudioEngine>,
    enhancer: Arc<dyn LoudnessEnhancer>,
) -> Result<CoreService> {
    if config.media_scanner.is_none() {
        config.media_scanner = Some(Arc::new(bridge_desktop::DirectoryMediaScanner::new(
            music_dirs,
        )));
    }
    if config.content_resolver.is_none() {
        config.content_resolver = Some(Arc::new(bridge_desktop::FileContentResolver::new()));
    }

    bootstrap(config, engine, enhancer).await
}
