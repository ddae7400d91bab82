//! The artifact store boundary.

use std::path::Path;

use async_trait::async_trait;

use crate::content_type::content_type_for;
use crate::error::{StorageError, StorageResult};

/// Final handoff of finished artifacts.
///
/// Implementations take a byte buffer, a file name and a content type and
/// return a public reference to the stored object.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Store `bytes` under (a name derived from) `filename`.
    async fn upload(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> StorageResult<String>;

    /// Store a file from disk, typed by its extension.
    async fn upload_path(&self, path: &Path) -> StorageResult<String> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::invalid_filename(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        self.upload(bytes, &filename, content_type_for(path)).await
    }
}

/// `filename` prefixed with 8 random hex characters.
pub fn unique_name(filename: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", &id[..8], filename)
}

/// Reject names that would escape a flat namespace.
pub(crate) fn validate_filename(filename: &str) -> StorageResult<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(StorageError::invalid_filename(filename));
    }
    Ok(())
}
