//! Store selection from the environment.

use std::sync::Arc;

use tracing::info;

use crate::blob::{BlobStore, DEFAULT_BLOB_BASE_URL};
use crate::error::StorageResult;
use crate::local::{LocalArtifactStore, PlaceholderStore};
use crate::store::ArtifactStore;

/// Storage settings.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Bearer token for the blob service
    pub token: Option<String>,
    /// Blob service base URL, or a `file://` directory
    pub base_url: String,
    /// Return placeholder URLs instead of uploading
    pub mock_mode: bool,
}

impl StorageConfig {
    /// Read `BLOB_TOKEN`, `BLOB_BASE_URL` and `MOCK_MODE`.
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("BLOB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            base_url: std::env::var("BLOB_BASE_URL").unwrap_or_else(|_| DEFAULT_BLOB_BASE_URL.to_string()),
            mock_mode: std::env::var("MOCK_MODE")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false),
        }
    }

    /// Build the configured store.
    ///
    /// A `file://` base URL publishes locally. Otherwise a token selects the
    /// blob service and mock mode selects placeholder URLs. With none of
    /// these, artifacts stay in the output directory and `None` is returned.
    pub fn build(&self) -> StorageResult<Option<Arc<dyn ArtifactStore>>> {
        let store: Option<Arc<dyn ArtifactStore>> = if let Some(local) = LocalArtifactStore::from_file_url(&self.base_url) {
            Some(Arc::new(local))
        } else if let Some(token) = &self.token {
            Some(Arc::new(BlobStore::new(&self.base_url, token)?))
        } else if self.mock_mode {
            Some(Arc::new(PlaceholderStore))
        } else {
            None
        };

        match &store {
            Some(s) => info!(store = s.name(), "Artifact store configured"),
            None => info!("No artifact store configured, keeping outputs local"),
        }
        Ok(store)
    }
}
