//! Recording fakes for the engine and enhancer bridges.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    AudioEngine, EngineEvent, EngineEventSender, EngineState, LoudnessEnhancer, MediaItem,
};
use core_library::{LoudnessStats, Track, TrackId};
use std::sync::Mutex;

// ============================================================================
// Fake AudioEngine
// ============================================================================

#[derive(Default)]
struct EngineInner {
    listener: Option<EngineEventSender>,
    calls: Vec<String>,
    items: Vec<MediaItem>,
    playing: bool,
    index: usize,
    position_ms: i64,
    duration_ms: Option<i64>,
    fail_release: bool,
}

/// Engine double that records commands and reports playing-state changes
/// through the registered listener, like a real engine would.
#[derive(Default)]
pub struct FakeEngine {
    inner: Mutex<EngineInner>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(self, duration_ms: i64) -> Self {
        self.inner.lock().unwrap().duration_ms = Some(duration_ms);
        self
    }

    pub fn failing_release(self) -> Self {
        self.inner.lock().unwrap().fail_release = true;
        self
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

    pub fn items(&self) -> Vec<MediaItem> {
        self.inner.lock().unwrap().items.clone()
    }

    pub fn has_listener(&self) -> bool {
        self.inner.lock().unwrap().listener.is_some()
    }

    pub fn set_position(&self, position_ms: i64) {
        self.inner.lock().unwrap().position_ms = position_ms;
    }

    /// Push a callback as if it came from the engine thread.
    pub fn emit(&self, event: EngineEvent) {
        if let Some(listener) = &self.inner.lock().unwrap().listener {
            let _ = listener.send(event);
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.inner.lock().unwrap().calls.push(call.into());
    }

    fn set_playing(&self, playing: bool) {
        let mut inner = self.inner.lock().unwrap();
        if inner.playing != playing {
            inner.playing = playing;
            if let Some(listener) = &inner.listener {
                let _ = listener.send(EngineEvent::IsPlayingChanged(playing));
            }
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

    async fn set_media_items(&self, items: Vec<MediaItem>) -> Result<()> {
        let ids: Vec<&str> = items.iter().map(|i| i.media_id.as_str()).collect();
        self.record(format!("set_media_items:{}", ids.join(",")));
        self.inner.lock().unwrap().items = items;
        Ok(())
    }

    async fn clear_media_items(&self) -> Result<()> {
        self.record("clear_media_items");
        self.inner.lock().unwrap().items.clear();
        Ok(())
    }

    async fn prepare(&self) -> Result<()> {
        self.record("prepare");
        self.emit(EngineEvent::PlaybackStateChanged(EngineState::Buffering));
        self.emit(EngineEvent::PlaybackStateChanged(EngineState::Ready));
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.record("play");
        self.set_playing(true);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause");
        self.set_playing(false);
        Ok(())
    }

    async fn seek_to(&self, position_ms: i64) -> Result<()> {
        self.record(format!("seek_to:{}", position_ms));
        self.inner.lock().unwrap().position_ms = position_ms;
        Ok(())
    }

    async fn seek_to_item(&self, index: usize, position_ms: i64) -> Result<()> {
        self.record(format!("seek_to_item:{}:{}", index, position_ms));
        let mut inner = self.inner.lock().unwrap();
        inner.index = index;
        inner.position_ms = position_ms;
        Ok(())
    }

    async fn seek_to_default_position(&self, index: usize) -> Result<()> {
        self.record(format!("seek_to_default_position:{}", index));
        let mut inner = self.inner.lock().unwrap();
        inner.index = index;
        inner.position_ms = 0;
        Ok(())
    }

    async fn seek_to_next_item(&self) -> Result<()> {
        self.record("seek_to_next_item");
        Ok(())
    }

    async fn seek_forward(&self) -> Result<()> {
        self.record("seek_forward");
        Ok(())
    }

    async fn seek_back(&self) -> Result<()> {
        self.record("seek_back");
        Ok(())
    }

    async fn current_position_ms(&self) -> Result<i64> {
        Ok(self.inner.lock().unwrap().position_ms)
    }

    async fn duration_ms(&self) -> Result<Option<i64>> {
        Ok(self.inner.lock().unwrap().duration_ms)
    }

    async fn current_index(&self) -> Result<usize> {
        Ok(self.inner.lock().unwrap().index)
    }

    async fn is_playing(&self) -> Result<bool> {
        Ok(self.inner.lock().unwrap().playing)
    }

    async fn release(&self) -> Result<()> {
        self.record("release");
        if self.inner.lock().unwrap().fail_release {
            return Err(BridgeError::OperationFailed("engine busy".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Fake LoudnessEnhancer
// ============================================================================

#[derive(Default)]
pub struct FakeEnhancer {
    calls: Mutex<Vec<String>>,
    gains: Mutex<Vec<f32>>,
    fail_gain: bool,
}

impl FakeEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_gain() -> Self {
        Self {
            fail_gain: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn gains(&self) -> Vec<f32> {
        self.gains.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoudnessEnhancer for FakeEnhancer {
    async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_enabled:{}", enabled));
        Ok(())
    }

    async fn set_target_gain(&self, gain_db: f32) -> Result<()> {
        self.calls.lock().unwrap().push("set_target_gain".to_string());
        if self.fail_gain {
            return Err(BridgeError::NotAvailable("effect".to_string()));
        }
        self.gains.lock().unwrap().push(gain_db);
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.calls.lock().unwrap().push("release".to_string());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn track(id: i64) -> Track {
    Track::new(
        TrackId(id),
        format!("track-{}.mp3", id),
        format!("/music/track-{}.mp3", id),
        180_000,
    )
    .with_artist("Artist")
}

pub fn analyzed_track(id: i64, stats: LoudnessStats) -> Track {
    track(id).with_loudness(stats)
}
