//! The façade host UIs drive.
//!
//! [`CoreService`] owns the playback session and mirrors the library,
//! playlist, and selection state into `watch` channels so any number of UI
//! observers can render the latest value and follow later updates.

use bridge_traits::media::compare_by_display_name;
use core_async::sync::{broadcast, watch};
use core_library::{Playlist, PlaylistId, Track, TrackId};
use core_playback::{
    GainController, MusicState, PlaybackError, PlaybackSettings, PlaybackSnapshot,
    PlaybackStateMachine, PlayerIntent,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, Result};
use crate::normalization::{NormalizationReport, PlaylistNormalizationFlow};
use crate::state::{PlayerUiEvent, UiState};
use crate::CoreDependencies;

/// Primary façade exposed to host applications.
///
/// Cheap to clone; clones share one playback session.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<Inner>,
}

struct Inner {
    deps: Arc<CoreDependencies>,
    normalization: PlaylistNormalizationFlow,
    player: PlaybackStateMachine,
    ui_state: watch::Sender<UiState>,
    library: watch::Sender<Vec<Track>>,
    playlists: watch::Sender<Vec<Playlist>>,
    active_playlist: watch::Sender<Vec<Track>>,
    current_track: watch::Sender<Option<Track>>,
    selected: watch::Sender<Vec<TrackId>>,
    library_loaded: AtomicBool,
    shut_down: AtomicBool,
}

impl CoreService {
    /// Create a new service and start its playback session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(deps: CoreDependencies, config: &CoreConfig) -> Self {
        let gain = GainController::new(
            Arc::clone(&deps.enhancer),
            config.target_loudness_lufs,
            config.max_gain_db,
        )
        .with_event_bus(deps.event_bus.clone());

        let player = PlaybackStateMachine::start(
            Arc::clone(&deps.engine),
            gain,
            PlaybackSettings::from_config(config, deps.event_bus.clone()),
        );

        let normalization = PlaylistNormalizationFlow::new(
            Arc::clone(&deps.tracks),
            Arc::clone(&deps.analyzer),
            deps.event_bus.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                deps: Arc::new(deps),
                normalization,
                player,
                ui_state: watch::channel(UiState::Idle).0,
                library: watch::channel(Vec::new()).0,
                playlists: watch::channel(Vec::new()).0,
                active_playlist: watch::channel(Vec::new()).0,
                current_track: watch::channel(None).0,
                selected: watch::channel(Vec::new()).0,
                library_loaded: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Access the dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.inner.deps)
    }

    pub fn ui_state(&self) -> watch::Receiver<UiState> {
        self.inner.ui_state.subscribe()
    }

    pub fn library(&self) -> watch::Receiver<Vec<Track>> {
        self.inner.library.subscribe()
    }

    pub fn playlists(&self) -> watch::Receiver<Vec<Playlist>> {
        self.inner.playlists.subscribe()
    }

    /// Tracks of the playlist being played; empty while the library plays.
    pub fn active_playlist_tracks(&self) -> watch::Receiver<Vec<Track>> {
        self.inner.active_playlist.subscribe()
    }

    pub fn current_track(&self) -> watch::Receiver<Option<Track>> {
        self.inner.current_track.subscribe()
    }

    pub fn selected_ids_watch(&self) -> watch::Receiver<Vec<TrackId>> {
        self.inner.selected.subscribe()
    }

    pub fn playback(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.player.subscribe_snapshot()
    }

    /// Raw playback state stream, see [`PlaybackStateMachine::subscribe_states`].
    pub fn music_states(&self) -> broadcast::Receiver<MusicState> {
        self.inner.player.subscribe_states()
    }

    pub fn events(&self) -> broadcast::Receiver<CoreEvent> {
        self.inner.deps.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.deps.event_bus
    }

    /// Load the library and playlists unless a non-empty library is loaded.
    pub async fn load_music_if_needed(&self) -> Result<()> {
        if self.inner.library_loaded.load(Ordering::SeqCst) {
            debug!("Library already loaded");
            return Ok(());
        }

        self.fetch_music_list().await?;
        self.fetch_all_playlists().await?;
        Ok(())
    }

    /// Load the library, scanning the device when the store is empty.
    ///
    /// Publishes [`UiState::Loading`] and then the outcome. On success the
    /// engine is loaded with the library and the first track becomes current.
    pub async fn fetch_music_list(&self) -> Result<Vec<Track>> {
        self.inner.ui_state.send_replace(UiState::Loading);

        let (tracks, from_cache) = match self.load_library().await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "Failed to load music library");
                self.inner.ui_state.send_replace(UiState::Error(e.to_string()));
                self.emit(LibraryEvent::LoadFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        info!(track_count = tracks.len(), from_cache, "Music library loaded");

        self.inner.library.send_replace(tracks.clone());
        self.inner
            .ui_state
            .send_replace(UiState::Success(tracks.clone()));
        self.inner
            .library_loaded
            .store(!tracks.is_empty(), Ordering::SeqCst);
        self.emit(LibraryEvent::LibraryLoaded {
            track_count: tracks.len(),
            from_cache,
        });

        self.load_into_player(tracks.clone()).await?;

        Ok(tracks)
    }

    async fn load_library(&self) -> Result<(Vec<Track>, bool)> {
        let cached = self.inner.deps.tracks.find_all().await?;
        if !cached.is_empty() {
            return Ok((cached, true));
        }

        let mut scanned = self.inner.deps.scanner.scan_device_audio_files().await?;
        scanned.sort_by(compare_by_display_name);
        debug!(count = scanned.len(), "Scanned device audio");

        let tracks: Vec<Track> = scanned.into_iter().map(Track::from).collect();
        self.inner.deps.tracks.upsert_many(&tracks).await?;
        Ok((tracks, false))
    }

    /// Refresh the playlist observer from storage.
    pub async fn fetch_all_playlists(&self) -> Result<Vec<Playlist>> {
        match self.inner.deps.playlists.find_all().await {
            Ok(playlists) => {
                self.inner.playlists.send_replace(playlists.clone());
                Ok(playlists)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load playlists");
                Err(e.into())
            }
        }
    }

    /// Create a playlist from the current selection, then clear it.
    pub async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let playlist = self
            .create_playlist_with(name, &self.selected_ids())
            .await?;
        self.clear_selection();
        Ok(playlist)
    }

    /// Analyze `track_ids` and create a playlist holding them in order.
    pub async fn create_playlist_with(&self, name: &str, track_ids: &[TrackId]) -> Result<Playlist> {
        Playlist::validate_name(name).map_err(|message| {
            CoreError::Library(core_library::LibraryError::InvalidInput {
                field: "name".to_string(),
                message,
            })
        })?;

        self.normalize(track_ids).await?;

        let playlist = self.inner.deps.playlists.create(name, track_ids).await?;
        info!(playlist_id = %playlist.id, track_count = playlist.len(), "Created playlist");
        self.emit(LibraryEvent::PlaylistCreated {
            playlist_id: playlist.id.0,
            name: playlist.name.clone(),
        });

        self.fetch_all_playlists().await?;
        Ok(playlist)
    }

    /// Analyze `track_ids` and append them to the playlist.
    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: PlaylistId,
        track_ids: &[TrackId],
    ) -> Result<()> {
        self.normalize(track_ids).await?;

        self.inner
            .deps
            .playlists
            .add_tracks(playlist_id, track_ids)
            .await?;
        debug!(playlist_id = %playlist_id, count = track_ids.len(), "Added tracks to playlist");
        self.emit(LibraryEvent::PlaylistUpdated {
            playlist_id: playlist_id.0,
            change_type: "tracks_added".to_string(),
        });

        self.fetch_all_playlists().await?;
        Ok(())
    }

    /// Append the current selection to the playlist, then clear it.
    pub async fn add_selected_to_playlist(&self, playlist_id: PlaylistId) -> Result<()> {
        self.add_tracks_to_playlist(playlist_id, &self.selected_ids())
            .await?;
        self.clear_selection();
        Ok(())
    }

    /// Remove every occurrence of `track_id` from the playlist.
    ///
    /// Returns `false` when the track was not a member.
    pub async fn remove_track_from_playlist(
        &self,
        playlist_id: PlaylistId,
        track_id: TrackId,
    ) -> Result<bool> {
        let removed = self
            .inner
            .deps
            .playlists
            .remove_track(playlist_id, track_id)
            .await?;

        if removed {
            self.emit(LibraryEvent::PlaylistUpdated {
                playlist_id: playlist_id.0,
                change_type: "track_removed".to_string(),
            });
        }

        self.fetch_all_playlists().await?;
        Ok(removed)
    }

    async fn normalize(&self, track_ids: &[TrackId]) -> Result<NormalizationReport> {
        Ok(self.inner.normalization.run(track_ids).await?)
    }

    /// Add `id` to the selection, or remove it if already selected.
    pub fn toggle_selection(&self, id: TrackId) {
        self.inner.selected.send_modify(|selected| {
            if let Some(pos) = selected.iter().position(|s| *s == id) {
                selected.remove(pos);
            } else {
                selected.push(id);
            }
        });
    }

    pub fn clear_selection(&self) {
        self.inner.selected.send_modify(|selected| selected.clear());
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> Vec<TrackId> {
        self.inner.selected.borrow().clone()
    }

    /// Load the playlist's tracks into the engine, paused at the first one.
    pub async fn play_playlist(&self, playlist: &Playlist) -> Result<()> {
        let tracks = self
            .inner
            .deps
            .tracks
            .find_by_ids(&playlist.track_ids)
            .await?;

        if tracks.is_empty() {
            warn!(playlist_id = %playlist.id, "Playlist has no playable tracks");
        }

        self.inner.active_playlist.send_replace(tracks.clone());

        self.inner.player.clear_media_items().await?;
        self.load_into_player(tracks).await
    }

    /// Leave playlist mode and load the whole library again.
    pub async fn reset_playlist_selection(&self) -> Result<()> {
        let library = self.inner.library.borrow().clone();

        self.inner.active_playlist.send_replace(Vec::new());

        self.inner.player.clear_media_items().await?;
        self.load_into_player(library).await
    }

    /// Replace the engine list and make its first track current, gain included.
    async fn load_into_player(&self, tracks: Vec<Track>) -> Result<()> {
        let first = tracks.first().cloned();
        self.inner.current_track.send_replace(first.clone());

        self.inner.player.set_playlist(tracks).await?;
        if let Some(track) = first {
            self.inner.player.apply_normalization(track).await?;
        }
        Ok(())
    }

    /// Handle a player control from the UI.
    ///
    /// Selecting a track resolves it in the active playlist, or in the library
    /// when no playlist is active, and applies its normalization gain before
    /// the engine switches to it.
    pub async fn on_player_ui_event(&self, event: PlayerUiEvent) -> Result<()> {
        if let PlayerIntent::SelectedAudioChange(index) = event {
            let track = self.resolve_selection(index);
            let Some((position, track)) = track else {
                warn!(index, "Ignoring selection without tracks");
                return Ok(());
            };

            self.inner.current_track.send_replace(Some(track.clone()));
            self.inner.player.apply_normalization(track).await?;
            self.inner
                .player
                .handle(PlayerIntent::SelectedAudioChange(position as i64))
                .await?;
            return Ok(());
        }

        self.inner.player.handle(event).await?;
        Ok(())
    }

    fn resolve_selection(&self, index: i64) -> Option<(usize, Track)> {
        let active = self.inner.active_playlist.borrow();
        let library = self.inner.library.borrow();
        let list = if active.is_empty() { &*library } else { &*active };

        if list.is_empty() {
            return None;
        }

        let position = index.rem_euclid(list.len() as i64) as usize;
        Some((position, list[position].clone()))
    }

    /// Latest playback session state.
    pub fn playback_snapshot(&self) -> PlaybackSnapshot {
        self.inner.player.snapshot()
    }

    /// Stop playback and release the engine and loudness effect.
    ///
    /// Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        match self.inner.player.handle(PlayerIntent::Stop).await {
            Ok(()) | Err(PlaybackError::SessionClosed) => {}
            Err(e) => warn!(error = %e, "Failed to stop playback"),
        }
        self.inner.player.release().await;
        info!("Core service shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    fn emit(&self, event: LibraryEvent) {
        let _ = self.inner.deps.event_bus.emit(CoreEvent::Library(event));
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("library_tracks", &self.inner.library.borrow().len())
            .field("playlists", &self.inner.playlists.borrow().len())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
