//! Loudness analysis of tracks about to enter a playlist.

use core_library::models::dedup_track_ids;
use core_library::{Result, TrackId, TrackRepository};
use core_playback::TrackAnalyzer;
use core_runtime::events::{CoreEvent, EventBus, NormalizationEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one [`PlaylistNormalizationFlow::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Tracks measured and persisted during this run.
    pub analyzed: usize,
    /// Tracks that already had measurements.
    pub skipped: usize,
    /// Tracks whose analysis failed; they stay unmeasured.
    pub failed: usize,
    /// Ids with no library entry.
    pub missing: usize,
}

/// Measures the tracks added to a playlist before the playlist is written.
///
/// Runs sequentially, one analyzer process at a time. Analysis failures are
/// logged and skipped so they never block the playlist change; storage
/// failures are returned.
pub struct PlaylistNormalizationFlow {
    tracks: Arc<dyn TrackRepository>,
    analyzer: Arc<dyn TrackAnalyzer>,
    events: EventBus,
}

impl PlaylistNormalizationFlow {
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        analyzer: Arc<dyn TrackAnalyzer>,
        events: EventBus,
    ) -> Self {
        Self {
            tracks,
            analyzer,
            events,
        }
    }

    pub async fn run(&self, ids: &[TrackId]) -> Result<NormalizationReport> {
        let mut report = NormalizationReport::default();

        for id in dedup_track_ids(ids) {
            let track = match self.tracks.find_by_id(id).await? {
                Some(track) => track,
                None => {
                    debug!(track_id = %id, "Skipping unknown track");
                    report.missing += 1;
                    continue;
                }
            };

            if track.loudness.is_some() {
                report.skipped += 1;
                continue;
            }

            match self.analyzer.try_analyze(&track).await {
                Ok(stats) => {
                    self.tracks.update_loudness_stats(id, &stats).await?;
                    report.analyzed += 1;
                    let _ = self.events.emit(CoreEvent::Normalization(
                        NormalizationEvent::TrackAnalyzed {
                            track_id: id.0,
                            integrated_loudness: stats.integrated_loudness,
                            loudness_range: stats.loudness_range,
                            true_peak: stats.true_peak,
                        },
                    ));
                }
                Err(e) => {
                    warn!(track_id = %id, error = %e, "Skipping track after failed analysis");
                    report.failed += 1;
                    let _ = self.events.emit(CoreEvent::Normalization(
                        NormalizationEvent::AnalysisFailed {
                            track_id: id.0,
                            message: e.to_string(),
                        },
                    ));
                }
            }
        }

        info!(
            analyzed = report.analyzed,
            skipped = report.skipped,
            failed = report.failed,
            missing = report.missing,
            "Playlist normalization finished"
        );
        Ok(report)
    }
}
