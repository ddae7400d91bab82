//! Keyed store of finished runs.
//!
//! The store is created by the caller and handed to the pipeline behind an
//! `Arc`. Entries are inserted when a run finishes and removed either
//! explicitly or once they outlive the configured TTL.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use reelcut_media::Frame;
use reelcut_models::{Caption, RunId, TimeInterval};

/// Public references for a run's published artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactUrls {
    pub video: Option<String>,
    pub thumbnail: Option<String>,
    pub meme: Option<String>,
}

/// Everything retained from one run.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub run_id: RunId,
    pub interval: TimeInterval,
    /// Frames sampled from the extracted clip, in order
    pub frames: Vec<Frame>,
    pub caption: Caption,
    pub video: PathBuf,
    pub thumbnail: PathBuf,
    pub meme: PathBuf,
    pub urls: ArtifactUrls,
    pub created_at: Instant,
}

impl RunArtifacts {
    /// Index of the frame used when none is requested.
    pub fn middle_frame_index(&self) -> Option<usize> {
        if self.frames.is_empty() {
            None
        } else {
            Some(self.frames.len() / 2)
        }
    }

    /// Directory the run's artifacts were published into.
    pub fn output_dir(&self) -> Option<&std::path::Path> {
        self.video.parent()
    }
}

/// Run ID to artifacts map shared between the pipeline and its callers.
#[derive(Debug, Default)]
pub struct RunStore {
    runs: RwLock<HashMap<RunId, Arc<RunArtifacts>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a run.
    pub async fn insert(&self, artifacts: RunArtifacts) -> Arc<RunArtifacts> {
        let artifacts = Arc::new(artifacts);
        self.runs
            .write()
            .await
            .insert(artifacts.run_id.clone(), Arc::clone(&artifacts));
        artifacts
    }

    pub async fn get(&self, run_id: &RunId) -> Option<Arc<RunArtifacts>> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn evict(&self, run_id: &RunId) -> Option<Arc<RunArtifacts>> {
        self.runs.write().await.remove(run_id)
    }

    /// Drop every run older than `ttl`. Returns how many were removed.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let mut runs = self.runs.write().await;
        let before = runs.len();
        runs.retain(|run_id, artifacts| {
            let keep = artifacts.created_at.elapsed() < ttl;
            if !keep {
                debug!(run_id = %run_id, "Evicting expired run");
            }
            keep
        });
        before - runs.len()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::RgbImage;
    use reelcut_media::StillFormat;

    pub(crate) fn artifacts(run_id: &str, frames: usize, created_at: Instant) -> RunArtifacts {
        let frames = (0..frames)
            .map(|i| Frame::encode(i as u64 * 30, i as f64, RgbImage::new(8, 6), StillFormat::LOSSLESS).unwrap())
            .collect();
        RunArtifacts {
            run_id: RunId::from_string(run_id),
            interval: TimeInterval::new(2.0, 10.0, 8),
            frames,
            caption: Caption::modern("hello"),
            video: PathBuf::from("/tmp/out/r/final.mp4"),
            thumbnail: PathBuf::from("/tmp/out/r/thumbnail.png"),
            meme: PathBuf::from("/tmp/out/r/meme.png"),
            urls: ArtifactUrls::default(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_get_evict() {
        let store = RunStore::new();
        store.insert(artifacts("a", 3, Instant::now())).await;

        let run = store.get(&RunId::from_string("a")).await.unwrap();
        assert_eq!(run.frames.len(), 3);
        assert_eq!(run.middle_frame_index(), Some(1));
        assert!(store.get(&RunId::from_string("b")).await.is_none());

        assert!(store.evict(&RunId::from_string("a")).await.is_some());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_evict_expired_keeps_fresh_runs() {
        let store = RunStore::new();
        store.insert(artifacts("old", 1, Instant::now())).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        store.insert(artifacts("new", 1, Instant::now())).await;

        let removed = store.evict_expired(Duration::from_millis(150)).await;
        assert_eq!(removed, 1);
        assert!(store.get(&RunId::from_string("new")).await.is_some());
        assert!(store.get(&RunId::from_string("old")).await.is_none());
    }

    #[test]
    fn test_middle_frame_of_empty_run() {
        let run = artifacts("e", 0, Instant::now());
        assert_eq!(run.middle_frame_index(), None);
        assert_eq!(run.output_dir(), Some(std::path::Path::new("/tmp/out/r")));
    }
}
