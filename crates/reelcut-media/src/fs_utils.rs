//! Output staging and cross-device moves.
//!
//! Final artifacts are never written in place. Encoders write into a
//! [`StagedOutput`] next to the destination, and the file only appears under
//! its final name once [`StagedOutput::commit`] renames it. An abandoned or
//! failed stage leaves nothing usable behind.

use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// A temporary file in the destination directory, renamed on commit.
#[derive(Debug)]
pub struct StagedOutput {
    file: NamedTempFile,
    destination: PathBuf,
}

impl StagedOutput {
    /// Stage a write to `destination`. The staged name keeps the
    /// destination's extension so FFmpeg can infer the container.
    pub fn new(destination: impl AsRef<Path>) -> MediaResult<Self> {
        let destination = destination.as_ref().to_path_buf();
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let suffix = destination
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let file = Builder::new()
            .prefix(".staged-")
            .suffix(&suffix)
            .tempfile_in(&parent)?;

        Ok(Self { file, destination })
    }

    /// Where the encoder should write.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically move the staged file to its destination.
    pub fn commit(self) -> MediaResult<PathBuf> {
        let destination = self.destination;
        self.file
            .persist(&destination)
            .map_err(|e| MediaError::encode_failure(&destination, e.error.to_string()))?;
        Ok(destination)
    }
}

/// Write bytes to `destination` through a staged file.
pub fn write_atomically(destination: impl AsRef<Path>, bytes: &[u8]) -> MediaResult<PathBuf> {
    let staged = StagedOutput::new(destination)?;
    std::fs::write(staged.path(), bytes)
        .map_err(|e| MediaError::encode_failure(staged.destination(), e.to_string()))?;
    staged.commit()
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// A plain rename is tried first; on EXDEV the file is copied into a staged
/// file beside `dst`, committed, and the source removed.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let staged = StagedOutput::new(dst)?;
    fs::copy(src, staged.path()).await?;
    staged.commit()?;

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source file after cross-device move: {}: {}",
            src.display(),
            e
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staged_output_invisible_until_commit() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("out").join("meme.png");

        let staged = StagedOutput::new(&dst).unwrap();
        assert!(staged.path().to_string_lossy().ends_with(".png"));
        std::fs::write(staged.path(), b"png").unwrap();
        assert!(!dst.exists());

        let committed = staged.commit().unwrap();
        assert_eq!(committed, dst);
        assert_eq!(std::fs::read(&dst).unwrap(), b"png");
    }

    #[test]
    fn test_dropped_stage_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("clip.mp4");
        {
            let staged = StagedOutput::new(&dst).unwrap();
            std::fs::write(staged.path(), b"partial").unwrap();
        }
        assert!(!dst.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_atomically_overwrites() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("thumb.png");
        std::fs::write(&dst, b"old").unwrap();
        write_atomically(&dst, b"new").unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_move_file_to_subdirectory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.txt");
        let dst = dir.path().join("subdir").join("dest.txt");

        fs::write(&src, b"test content").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "test content");
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
