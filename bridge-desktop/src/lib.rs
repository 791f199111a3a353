//! # Desktop Bridge Implementations
//!
//! Default implementations of the media bridges for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `MediaScanner` walking music directories with `walkdir`, reading tags
//!   and duration with `lofty`
//! - `ContentResolver` serving plain paths and `file://` locators from the
//!   local filesystem
//!
//! Desktop hosts still provide their own `AudioEngine` and
//! `LoudnessEnhancer`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryMediaScanner, FileContentResolver};
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/library.db")
//!     .cache_dir("/data/cache")
//!     .media_scanner(Arc::new(DirectoryMediaScanner::new(vec!["/home/me/Music".into()])))
//!     .content_resolver(Arc::new(FileContentResolver::new()))
//!     .build()?;
//! ```

mod content;
mod scanner;

pub use content::FileContentResolver;
pub use scanner::{mime_for_extension, DirectoryMediaScanner, UNKNOWN_ARTIST};
