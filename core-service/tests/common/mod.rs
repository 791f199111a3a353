//! Bridge fakes and repository mocks shared by the service tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    AudioEngine, EngineEvent, EngineEventSender, EngineState, LoudnessEnhancer, MediaItem,
    MediaScanner, ScannedAudio,
};
use core_library::{
    LoudnessStats, Playlist, PlaylistId, PlaylistRepository, Result, Track, TrackId,
    TrackRepository,
};
use core_playback::{PlaybackError, TrackAnalyzer};
use mockall::mock;
use std::sync::Mutex;

// ============================================================================
// Repository mocks
// ============================================================================

mock! {
    pub TrackRepo {}

    #[async_trait]
    impl TrackRepository for TrackRepo {
        async fn find_all(&self) -> Result<Vec<Track>>;
        async fn find_by_id(&self, id: TrackId) -> Result<Option<Track>>;
        async fn find_by_ids(&self, ids: &[TrackId]) -> Result<Vec<Track>>;
        async fn upsert_many(&self, tracks: &[Track]) -> Result<()>;
        async fn update_loudness_stats(&self, id: TrackId, stats: &LoudnessStats) -> Result<()>;
        async fn count(&self) -> Result<i64>;
    }
}

mock! {
    pub PlaylistRepo {}

    #[async_trait]
    impl PlaylistRepository for PlaylistRepo {
        async fn create(&self, name: &str, track_ids: &[TrackId]) -> Result<Playlist>;
        async fn find_all(&self) -> Result<Vec<Playlist>>;
        async fn find_by_id(&self, id: PlaylistId) -> Result<Option<Playlist>>;
        async fn add_tracks(&self, id: PlaylistId, track_ids: &[TrackId]) -> Result<()>;
        async fn remove_track(&self, id: PlaylistId, track_id: TrackId) -> Result<bool>;
        async fn get_track_ids(&self, id: PlaylistId) -> Result<Vec<TrackId>>;
        async fn count(&self) -> Result<i64>;
    }
}

// ============================================================================
// Fake AudioEngine
// ============================================================================

#[derive(Default)]
struct EngineInner {
    listener: Option<EngineEventSender>,
    calls: Vec<String>,
    playing: bool,
    index: usize,
}

/// Records commands and reports playing/ready transitions to the listener.
#[derive(Default)]
pub struct FakeEngine {
    inner: Mutex<EngineInner>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    fn record(&self, call: impl Into<String>) {
        self.inner.lock().unwrap().calls.push(call.into());
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(listener) = &self.inner.lock().unwrap().listener {
            let _ = listener.send(event);
        }
    }

    fn set_playing(&self, playing: bool) {
        let changed = {
            let mut inner = self.inner.lock().unwrap();
            let changed = inner.playing != playing;
            inner.playing = playing;
            changed
        };
        if changed {
            self.emit(EngineEvent::IsPlayingChanged(playing));
        }
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    fn set_listener(&self, listener: EngineEventSender) {
        self.inner.lock().unwrap().listener = Some(listener);
    }

    fn clear_listener(&self) {
        self.record("clear_listener");
        self.inner.lock().unwrap().listener = None;
    }

    async fn set_media_items(&self, items: Vec<MediaItem>) -> BridgeResult<()> {
        let ids: Vec<&str> = items.iter().map(|i| i.media_id.as_str()).collect();
        self.record(format!("set_media_items:{}", ids.join(",")));
        Ok(())
    }

    async fn clear_media_items(&self) -> BridgeResult<()> {
        self.record("clear_media_items");
        Ok(())
    }

    async fn prepare(&self) -> BridgeResult<()> {
        self.record("prepare");
        self.emit(EngineEvent::PlaybackStateChanged(EngineState::Ready));
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record("play");
        self.set_playing(true);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        self.set_playing(false);
        Ok(())
    }

    async fn seek_to(&self, position_ms: i64) -> BridgeResult<()> {
        self.record(format!("seek_to:{}", position_ms));
        Ok(())
    }

    async fn seek_to_item(&self, index: usize, position_ms: i64) -> BridgeResult<()> {
        self.record(format!("seek_to_item:{}:{}", index, position_ms));
        self.inner.lock().unwrap().index = index;
        Ok(())
    }

    async fn seek_to_default_position(&self, index: usize) -> BridgeResult<()> {
        self.record(format!("seek_to_default_position:{}", index));
        self.inner.lock().unwrap().index = index;
        Ok(())
    }

    async fn seek_to_next_item(&self) -> BridgeResult<()> {
        self.record("seek_to_next_item");
        Ok(())
    }

    async fn seek_forward(&self) -> BridgeResult<()> {
        self.record("seek_forward");
        Ok(())
    }

    async fn seek_back(&self) -> BridgeResult<()> {
        self.record("seek_back");
        Ok(())
    }

    async fn current_position_ms(&self) -> BridgeResult<i64> {
        Ok(0)
    }

    async fn duration_ms(&self) -> BridgeResult<Option<i64>> {
        Ok(Some(180_000))
    }

    async fn current_index(&self) -> BridgeResult<usize> {
        Ok(self.inner.lock().unwrap().index)
    }

    async fn is_playing(&self) -> BridgeResult<bool> {
        Ok(self.inner.lock().unwrap().playing)
    }

    async fn release(&self) -> BridgeResult<()> {
        self.record("release");
        Ok(())
    }
}

// ============================================================================
// Fake LoudnessEnhancer
// ============================================================================

#[derive(Default)]
pub struct FakeEnhancer {
    gains: Mutex<Vec<f32>>,
    released: Mutex<usize>,
}

impl FakeEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gains(&self) -> Vec<f32> {
        self.gains.lock().unwrap().clone()
    }

    pub fn release_count(&self) -> usize {
        *self.released.lock().unwrap()
    }
}

#[async_trait]
impl LoudnessEnhancer for FakeEnhancer {
    async fn set_enabled(&self, _enabled: bool) -> BridgeResult<()> {
        Ok(())
    }

    async fn set_target_gain(&self, gain_db: f32) -> BridgeResult<()> {
        self.gains.lock().unwrap().push(gain_db);
        Ok(())
    }

    async fn release(&self) -> BridgeResult<()> {
        *self.released.lock().unwrap() += 1;
        Ok(())
    }
}

// ============================================================================
// Fake MediaScanner
// ============================================================================

#[derive(Default)]
pub struct FakeScanner {
    files: Vec<ScannedAudio>,
    scans: Mutex<usize>,
    fail: bool,
}

impl FakeScanner {
    pub fn with_files(files: Vec<ScannedAudio>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn scans(&self) -> usize {
        *self.scans.lock().unwrap()
    }
}

#[async_trait]
impl MediaScanner for FakeScanner {
    async fn scan_device_audio_files(&self) -> BridgeResult<Vec<ScannedAudio>> {
        *self.scans.lock().unwrap() += 1;
        if self.fail {
            return Err(BridgeError::NotAvailable("media index".to_string()));
        }
        Ok(self.files.clone())
    }
}

// ============================================================================
// Fake TrackAnalyzer
// ============================================================================

/// Returns fixed statistics, or fails every run.
pub struct FakeAnalyzer {
    stats: LoudnessStats,
    fail: bool,
    calls: Mutex<Vec<TrackId>>,
}

impl FakeAnalyzer {
    pub fn returning(stats: LoudnessStats) -> Self {
        Self {
            stats,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            stats: LoudnessStats::default(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TrackId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackAnalyzer for FakeAnalyzer {
    async fn try_analyze(&self, track: &Track) -> core_playback::Result<LoudnessStats> {
        self.calls.lock().unwrap().push(track.id);
        if self.fail {
            return Err(PlaybackError::MissingLoudnessSummary);
        }
        Ok(self.stats)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn scanned(id: i64, name: &str) -> ScannedAudio {
    ScannedAudio {
        id,
        display_name: name.to_string(),
        artist: "Artist".to_string(),
        title: name.trim_end_matches(".mp3").to_string(),
        album_art: None,
        content_uri: format!("/music/{}", name),
        duration_ms: 180_000,
        mime_type: "audio/mpeg".to_string(),
    }
}

pub fn track(id: i64) -> Track {
    Track::new(
        TrackId(id),
        format!("track-{}.mp3", id),
        format!("/music/track-{}.mp3", id),
        180_000,
    )
    .with_artist("Artist")
}

pub fn playlist(id: i64, name: &str, ids: &[i64]) -> Playlist {
    Playlist {
        id: PlaylistId(id),
        name: name.to_string(),
        track_ids: ids.iter().copied().map(TrackId).collect(),
        created_at: 1_700_000_000,
        updated_at: 1_700_000_000,
    }
}
