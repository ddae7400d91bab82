//! Filesystem and mock-mode stores.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::StorageResult;
use crate::store::{validate_filename, ArtifactStore};

/// Host used by [`PlaceholderStore`] URLs.
pub const MOCK_STORAGE_HOST: &str = "https://mock-storage.local";

/// Publishes artifacts into a local directory and returns `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build from a `file://` URL, e.g. `file:///srv/reelcut/public`.
    pub fn from_file_url(url: &str) -> Option<Self> {
        url.strip_prefix("file://")
            .filter(|p| !p.is_empty())
            .map(|p| Self::new(PathBuf::from(p)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> StorageResult<String> {
        validate_filename(filename)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let dest = self.root.join(filename);
        let staged = self.root.join(format!(".{}.partial", filename));
        tokio::fs::write(&staged, &bytes).await?;
        tokio::fs::rename(&staged, &dest).await?;

        debug!(content_type = content_type, size = bytes.len(), "Stored artifact locally");
        info!(path = %dest.display(), "Published artifact");
        Ok(format!("file://{}", dest.display()))
    }
}

/// Mock-mode store: uploads nothing and returns placeholder URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderStore;

#[async_trait]
impl ArtifactStore for PlaceholderStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn upload(&self, bytes: Vec<u8>, filename: &str, _content_type: &str) -> StorageResult<String> {
        validate_filename(filename)?;
        debug!(filename = filename, size = bytes.len(), "Mock upload");
        Ok(format!("{}/{}", MOCK_STORAGE_HOST, filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_store_writes_and_returns_file_url() {
        let dir = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(dir.path().join("public"));

        let url = store.upload(b"meme".to_vec(), "meme.png", "image/png").await.unwrap();
        let dest = dir.path().join("public").join("meme.png");
        assert_eq!(url, format!("file://{}", dest.display()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"meme");
        assert_eq!(std::fs::read_dir(dir.path().join("public")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_local_store_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        assert!(store.upload(vec![1], "../escape.png", "image/png").await.is_err());
    }

    #[test]
    fn test_from_file_url() {
        let store = LocalArtifactStore::from_file_url("file:///srv/public").unwrap();
        assert_eq!(store.root(), Path::new("/srv/public"));
        assert!(LocalArtifactStore::from_file_url("https://blob.example").is_none());
        assert!(LocalArtifactStore::from_file_url("file://").is_none());
    }

    #[tokio::test]
    async fn test_placeholder_urls() {
        let url = PlaceholderStore.upload(vec![], "final.mp4", "video/mp4").await.unwrap();
        assert_eq!(url, "https://mock-storage.local/final.mp4");
    }
}
