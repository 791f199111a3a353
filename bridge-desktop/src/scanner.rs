//! Media scanner walking local music directories.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{compare_by_display_name, is_indexable_audio_mime, MediaScanner, ScannedAudio},
};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Artist reported for files without an artist tag.
pub const UNKNOWN_ARTIST: &str = "<unknown>";

/// MIME type for a file extension, `None` for non-audio extensions.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "opus" => "audio/opus",
        "wav" => "audio/wav",
        "m4a" | "mp4a" => "audio/mp4",
        "aif" | "aiff" => "audio/aiff",
        "wma" => "audio/x-ms-wma",
        "aac" => "audio/aac",
        "amr" => "audio/amr",
        "3gp" | "3ga" => "audio/3gpp",
        _ => return None,
    };
    Some(mime)
}

/// [`MediaScanner`] over a set of local directories.
///
/// Tags and duration come from `lofty`; unreadable files are still reported
/// with the file stem as title and a zero duration. Ids are derived from the
/// canonical path, so they stay stable across scans.
#[derive(Debug, Clone)]
pub struct DirectoryMediaScanner {
    roots: Vec<PathBuf>,
    follow_links: bool,
}

impl DirectoryMediaScanner {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            follow_links: false,
        }
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn scan_blocking(&self) -> Vec<ScannedAudio> {
        let mut found = Vec::new();

        for root in &self.roots {
            if !root.exists() {
                warn!(root = %root.display(), "Music directory does not exist");
                continue;
            }

            for entry in WalkDir::new(root)
                .follow_links(self.follow_links)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if let Some(audio) = read_audio(entry.path()) {
                    found.push(audio);
                }
            }
        }

        // Overlapping roots report the same file twice.
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.dedup_by(|a, b| a.id == b.id);
        found.sort_by(compare_by_display_name);
        found
    }
}

#[async_trait]
impl MediaScanner for DirectoryMediaScanner {
    async fn scan_device_audio_files(&self) -> Result<Vec<ScannedAudio>> {
        let scanner = self.clone();
        let found = core_async::task::spawn_blocking(move || scanner.scan_blocking())
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Media scan aborted: {}", e)))?;

        info!(count = found.len(), roots = self.roots.len(), "Scanned music directories");
        Ok(found)
    }
}

fn read_audio(path: &Path) -> Option<ScannedAudio> {
    let mime_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(mime_for_extension)?;
    if !is_indexable_audio_mime(mime_type) {
        return None;
    }

    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let display_name = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_name.clone());

    let tags = read_tags(&canonical);

    Some(ScannedAudio {
        id: stable_id(&canonical),
        display_name,
        artist: tags
            .artist
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        title: tags.title.filter(|t| !t.trim().is_empty()).unwrap_or(stem),
        album_art: None,
        content_uri: canonical.to_string_lossy().into_owned(),
        duration_ms: tags.duration_ms,
        mime_type: mime_type.to_string(),
    })
}

#[derive(Default)]
struct FileTags {
    title: Option<String>,
    artist: Option<String>,
    duration_ms: i64,
}

fn read_tags(path: &Path) -> FileTags {
    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(file) => file,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "Failed to read tags");
            return FileTags::default();
        }
    };

    let duration_ms = i64::try_from(tagged_file.properties().duration().as_millis()).unwrap_or(0);
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    FileTags {
        title: tag.and_then(|t| t.title().map(|s| s.trim().to_string())),
        artist: tag.and_then(|t| t.artist().map(|s| s.trim().to_string())),
        duration_ms,
    }
}

/// Positive id from the SHA-256 of the path.
fn stable_id(path: &Path) -> i64 {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes) & i64::MAX
}
