//! Content resolver for plain paths and `file://` locators.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::ContentResolver,
};
use bytes::Bytes;
use core_async::fs;
use std::path::PathBuf;
use tracing::debug;

const FILE_SCHEME: &str = "file://";

/// Reads track content straight from the local filesystem.
///
/// Every supported locator maps to a local path, so the loudness analyzer
/// never needs a temporary copy.
#[derive(Debug, Clone, Default)]
pub struct FileContentResolver;

impl FileContentResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentResolver for FileContentResolver {
    async fn read_content(&self, uri: &str) -> Result<Bytes> {
        let path = self.local_path(uri).ok_or_else(|| {
            BridgeError::NotAvailable(format!("Unsupported content locator: {}", uri))
        })?;

        let data = fs::read(&path).await?;
        debug!(path = %path.display(), bytes = data.len(), "Read track content");
        Ok(Bytes::from(data))
    }

    fn local_path(&self, uri: &str) -> Option<PathBuf> {
        if let Some(rest) = uri.strip_prefix(FILE_SCHEME) {
            return (!rest.is_empty()).then(|| PathBuf::from(rest));
        }
        if uri.is_empty() || uri.contains("://") {
            return None;
        }
        Some(PathBuf::from(uri))
    }
}
