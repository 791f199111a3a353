//! Media index and content access bridges.
//!
//! [`MediaScanner`] enumerates the audio files available on the device.
//! [`ContentResolver`] turns a content locator back into bytes, or into a
//! plain filesystem path when the platform can expose one directly.

use crate::{error::Result, platform::PlatformSendSync};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Audio MIME types that the media index never reports.
///
/// Voice-memo and raw ADTS containers are skipped because they are almost
/// never music and several engines cannot seek inside them.
pub const EXCLUDED_AUDIO_MIME_TYPES: &[&str] = &["audio/amr", "audio/3gpp", "audio/aac"];

/// Returns `true` when a file with this MIME type belongs in the library.
pub fn is_indexable_audio_mime(mime_type: &str) -> bool {
    let mime = mime_type.trim().to_ascii_lowercase();
    mime.starts_with("audio/") && !EXCLUDED_AUDIO_MIME_TYPES.contains(&mime.as_str())
}

/// One audio file reported by the media index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedAudio {
    /// Stable numeric identifier assigned by the index.
    pub id: i64,
    /// File display name (usually the file name).
    pub display_name: String,
    pub artist: String,
    pub title: String,
    /// Album art locator, when the index has one.
    pub album_art: Option<String>,
    /// Locator used to open the audio content.
    pub content_uri: String,
    pub duration_ms: i64,
    pub mime_type: String,
}

/// Orders entries by display name, then by id.
///
/// Only ASCII letters are case-folded, the same as SQLite's `NOCASE`
/// collation, so a fresh scan and the stored library list agree.
pub fn compare_by_display_name(a: &ScannedAudio, b: &ScannedAudio) -> Ordering {
    a.display_name
        .to_ascii_lowercase()
        .cmp(&b.display_name.to_ascii_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

/// One-shot enumeration of the device's audio content.
///
/// Implementations must only return indexable audio (see
/// [`is_indexable_audio_mime`]) sorted with [`compare_by_display_name`].
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaScanner: PlatformSendSync {
    async fn scan_device_audio_files(&self) -> Result<Vec<ScannedAudio>>;
}

/// Access to the raw bytes behind a content locator.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait ContentResolver: PlatformSendSync {
    /// Read the whole content behind `uri`.
    async fn read_content(&self, uri: &str) -> Result<Bytes>;

    /// Filesystem path for `uri` when external tools can open it directly.
    fn local_path(&self, _uri: &str) -> Option<PathBuf> {
        None
    }
}
