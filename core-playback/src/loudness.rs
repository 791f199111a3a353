//! # Loudness Analysis
//!
//! Measures EBU R128 loudness of a track by running `ffmpeg` with the
//! `loudnorm` filter in analysis-only mode and reading the JSON summary it
//! prints at the end of the run.
//!
//! ## Input
//!
//! If the host [`ContentResolver`] exposes a local path for the track, ffmpeg
//! reads it directly. Otherwise the bytes are copied into a uniquely named
//! file under the configured cache directory, which is removed again once the
//! run finished, whatever the outcome.
//!
//! ## Failures
//!
//! [`TrackAnalyzer::try_analyze`] reports failures as [`PlaybackError`]s.
//! [`TrackAnalyzer::analyze`] logs them and returns zeroed statistics.

use async_trait::async_trait;
use bridge_traits::ContentResolver;
use core_async::fs;
use core_async::process::{Command, Stdio};
use core_async::time::{timeout, Duration};
use core_library::{LoudnessStats, Track};
use core_runtime::config::{CoreConfig, DEFAULT_ANALYSIS_TIMEOUT};
use core_runtime::logging::strip_path;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PlaybackError, Result};

/// Number of stderr lines kept in failure reports.
const STDERR_TAIL_LINES: usize = 10;

/// Extracts loudness statistics from ffmpeg `loudnorm` output.
///
/// The summary is the JSON object between the first `{` and the last `}`.
/// `input_i`, `input_lra` and `input_tp` may be JSON strings or numbers; a
/// missing, unparsable or non-finite value reads as `0.0`. Returns `None`
/// when the output holds no JSON object.
pub fn parse_loudnorm_output(output: &str) -> Option<LoudnessStats> {
    let end = output.rfind('}')?;

    // Earlier braces can come from metadata echoed by ffmpeg, so fall back to
    // later opening braces when the widest slice is not a JSON object.
    let summary = output[..end]
        .match_indices('{')
        .map(|(start, _)| start)
        .find_map(|start| match serde_json::from_str::<Value>(&output[start..=end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })?;

    Some(LoudnessStats::new(
        read_field(&summary, "input_i"),
        read_field(&summary, "input_lra"),
        read_field(&summary, "input_tp"),
    ))
}

fn read_field(summary: &Map<String, Value>, key: &str) -> f32 {
    let value = match summary.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Settings for [`LoudnessAnalyzer`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// ffmpeg executable name or path
    pub ffmpeg_path: PathBuf,
    /// Directory for temporary copies of non-local content
    pub cache_dir: PathBuf,
    /// Limit for one ffmpeg run
    pub timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            cache_dir: std::env::temp_dir(),
            timeout: DEFAULT_ANALYSIS_TIMEOUT,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_core_config(config: &CoreConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            cache_dir: config.cache_dir.clone(),
            timeout: config.analysis_timeout,
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Computes loudness statistics for a track.
#[async_trait]
pub trait TrackAnalyzer: Send + Sync {
    /// Measure `track`, reporting why the measurement failed.
    async fn try_analyze(&self, track: &Track) -> Result<LoudnessStats>;

    /// Measure `track`; failures are logged and yield zeroed statistics.
    async fn analyze(&self, track: &Track) -> LoudnessStats {
        match self.try_analyze(track).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(track_id = %track.id, error = %e, "Loudness analysis failed");
                LoudnessStats::default()
            }
        }
    }
}

/// ffmpeg-backed [`TrackAnalyzer`].
///
/// Holds no per-run state, so one instance can analyze several tracks
/// concurrently.
pub struct LoudnessAnalyzer {
    config: AnalyzerConfig,
    resolver: Arc<dyn ContentResolver>,
}

impl LoudnessAnalyzer {
    pub fn new(config: AnalyzerConfig, resolver: Arc<dyn ContentResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    async fn materialize(&self, track: &Track) -> Result<AnalysisInput> {
        if let Some(path) = self.resolver.local_path(&track.content_uri) {
            return Ok(AnalysisInput::Local(path));
        }

        let bytes = self
            .resolver
            .read_content(&track.content_uri)
            .await
            .map_err(|e| {
                debug!(track_id = %track.id, permanent = e.is_permanent(), "Content read failed");
                PlaybackError::ContentUnavailable(format!(
                    "{}: {}",
                    strip_path(&track.content_uri),
                    e
                ))
            })?;

        fs::create_dir_all(&self.config.cache_dir).await?;

        let extension = Path::new(&track.display_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("audio");
        let copy = TempCopy(
            self.config
                .cache_dir
                .join(format!("loudness-{}.{}", Uuid::new_v4(), extension)),
        );
        fs::write(&copy.0, &bytes).await?;

        debug!(track_id = %track.id, bytes = bytes.len(), "Materialized analysis copy");
        Ok(AnalysisInput::Copy(copy))
    }

    async fn run_ffmpeg(&self, input: &Path) -> Result<String> {
        let mut command = Command::new(&self.config.ffmpeg_path);
        command
            .arg("-hide_banner")
            .arg("-nostdin")
            .arg("-i")
            .arg(input)
            .args(["-af", "loudnorm=print_format=json", "-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|source| PlaybackError::AnalyzerLaunch {
                tool: self.config.ffmpeg_path.display().to_string(),
                source,
            })?;

        // Dropping the child on timeout kills it.
        let output = timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| PlaybackError::AnalysisTimeout(self.config.timeout))??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let stderr_tail = tail_lines(&stderr, STDERR_TAIL_LINES);
            warn!(
                status = %output.status,
                stderr = %stderr_tail,
                "ffmpeg loudness pass failed"
            );
            return Err(PlaybackError::AnalysisFailed {
                status: output.status.to_string(),
                stderr_tail,
            });
        }

        // loudnorm prints its summary to stderr; keep stdout for wrappers
        // that redirect it.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push('\n');
        combined.push_str(&stderr);
        Ok(combined)
    }
}

#[async_trait]
impl TrackAnalyzer for LoudnessAnalyzer {
    async fn try_analyze(&self, track: &Track) -> Result<LoudnessStats> {
        let input = self.materialize(track).await?;
        let output = self.run_ffmpeg(input.path()).await?;
        drop(input);

        let stats = parse_loudnorm_output(&output).ok_or(PlaybackError::MissingLoudnessSummary)?;

        info!(
            track_id = %track.id,
            file = strip_path(&track.content_uri),
            integrated_loudness = stats.integrated_loudness,
            loudness_range = stats.loudness_range,
            true_peak = stats.true_peak,
            "Analyzed track loudness"
        );
        Ok(stats)
    }
}

impl std::fmt::Debug for LoudnessAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoudnessAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum AnalysisInput {
    Local(PathBuf),
    Copy(TempCopy),
}

impl AnalysisInput {
    fn path(&self) -> &Path {
        match self {
            AnalysisInput::Local(path) => path,
            AnalysisInput::Copy(copy) => &copy.0,
        }
    }
}

/// Removes the temporary copy when dropped.
struct TempCopy(PathBuf);

impl Drop for TempCopy {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    file = strip_path(&self.0.to_string_lossy()),
                    error = %e,
                    "Failed to remove analysis copy"
                );
            }
        }
    }
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}
