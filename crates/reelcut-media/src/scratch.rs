//! Per-run scratch directories.

use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::{debug, warn};

use reelcut_models::RunId;

use crate::error::MediaResult;

/// A uniquely named directory for one run's intermediate files.
///
/// The directory and everything in it is removed when the value is dropped,
/// on success and failure paths alike. Removal errors are logged only.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create `run-<id>-XXXXXX` under `work_dir`, creating `work_dir` if needed.
    pub fn create(work_dir: impl AsRef<Path>, run_id: &RunId) -> MediaResult<Self> {
        let work_dir = work_dir.as_ref();
        std::fs::create_dir_all(work_dir)?;

        let dir = Builder::new()
            .prefix(&format!("run-{}-", run_id))
            .tempdir_in(work_dir)?;
        let path = dir.path().to_path_buf();

        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a named artifact inside the scratch directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// A temporary file inside the scratch directory, deleted on drop.
    pub fn temp_file(&self, prefix: &str, suffix: &str) -> MediaResult<NamedTempFile> {
        Ok(Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.path)?)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!(path = %self.path.display(), "Removed scratch directory"),
                Err(e) => warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch directory"
                ),
            }
        }
    }
}
