//! Loudness-based gain correction.
//!
//! [`calculate_dynamic_gain`] turns measured [`LoudnessStats`] into a gain in
//! decibels. [`GainController`] pushes that gain into the host's hardware
//! loudness effect whenever the active track changes.

use bridge_traits::LoudnessEnhancer;
use core_library::{LoudnessStats, Track};
use core_runtime::events::{CoreEvent, EventBus, NormalizationEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

/// Target integrated loudness in LUFS.
pub const DEFAULT_TARGET_LOUDNESS: f32 = -14.0;

/// Largest correction applied in either direction, in dB.
pub const DEFAULT_MAX_GAIN: f32 = 15.0;

/// Gain in dB that moves a track towards `target_loudness`.
///
/// The correction shrinks as the loudness range grows and vanishes at a
/// range of 20 LU or more. The result is clamped to `[-max_gain, max_gain]`.
/// All arithmetic is single precision.
///
/// ```
/// use core_library::LoudnessStats;
/// use core_playback::gain::{calculate_dynamic_gain, DEFAULT_MAX_GAIN, DEFAULT_TARGET_LOUDNESS};
///
/// let stats = LoudnessStats::new(-20.0, 10.0, -3.0);
/// let gain = calculate_dynamic_gain(&stats, DEFAULT_TARGET_LOUDNESS, DEFAULT_MAX_GAIN);
/// assert_eq!(gain, 3.0);
/// ```
pub fn calculate_dynamic_gain(stats: &LoudnessStats, target_loudness: f32, max_gain: f32) -> f32 {
    let base_gain = target_loudness - stats.integrated_loudness;
    let dynamic_factor = (stats.loudness_range / 20.0).min(1.0);
    let gain = base_gain * (1.0 - dynamic_factor);

    let limit = max_gain.abs();
    gain.max(-limit).min(limit)
}

/// Applies per-track gain through the host loudness enhancer.
pub struct GainController {
    enhancer: Arc<dyn LoudnessEnhancer>,
    target_loudness: f32,
    max_gain: f32,
    enabled: AtomicBool,
    events: Option<EventBus>,
}

impl GainController {
    pub fn new(enhancer: Arc<dyn LoudnessEnhancer>, target_loudness: f32, max_gain: f32) -> Self {
        Self {
            enhancer,
            target_loudness,
            max_gain: max_gain.abs(),
            enabled: AtomicBool::new(false),
            events: None,
        }
    }

    /// Publish `GainApplied` events on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn target_loudness(&self) -> f32 {
        self.target_loudness
    }

    pub fn max_gain(&self) -> f32 {
        self.max_gain
    }

    /// Enable the effect. Only the first successful call reaches the host.
    pub async fn enable(&self) {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.enhancer.set_enabled(true).await {
            self.enabled.store(false, Ordering::SeqCst);
            warn!(error = %e, "Failed to enable loudness enhancer");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Gain for a track; tracks without measurements get no correction.
    pub fn gain_for(&self, stats: Option<&LoudnessStats>) -> f32 {
        stats
            .map(|stats| calculate_dynamic_gain(stats, self.target_loudness, self.max_gain))
            .unwrap_or(0.0)
    }

    /// Set the effect gain for `track`. Failures are logged and swallowed.
    pub async fn apply_normalization(&self, track: &Track) {
        let gain_db = self.gain_for(track.loudness.as_ref());

        match self.enhancer.set_target_gain(gain_db).await {
            Ok(()) => {
                debug!(track_id = %track.id, gain_db, "Applied normalization gain");
                if let Some(bus) = &self.events {
                    let _ = bus.emit(CoreEvent::Normalization(NormalizationEvent::GainApplied {
                        track_id: track.id.0,
                        gain_db,
                    }));
                }
            }
            Err(e) => {
                warn!(track_id = %track.id, gain_db, error = %e, "Failed to apply normalization gain");
            }
        }
    }

    /// Release the host effect.
    pub async fn release(&self) -> Result<()> {
        self.enabled.store(false, Ordering::SeqCst);
        self.enhancer.release().await?;
        Ok(())
    }
}

impl std::fmt::Debug for GainController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GainController")
            .field("target_loudness", &self.target_loudness)
            .field("max_gain", &self.max_gain)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
