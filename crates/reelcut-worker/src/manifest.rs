//! Run manifests and the file-backed collaborators they describe.
//!
//! A manifest is a JSON document naming the source video together with the
//! output the external collaborators already produced for it:
//!
//! ```json
//! {
//!   "source": "videos/cat.mp4",
//!   "moments": [{"start": 12.5, "end": 21, "score": 8, "label": "the jump"}],
//!   "narration": "audio/cat-voiceover.mp3",
//!   "caption": {"template": "modern", "body_text": "when the zoomies hit"},
//!   "format": "tall"
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use reelcut_media::Frame;
use reelcut_models::{CaptionRecord, DurationLimits, MemeFormat, RunId, TimeInterval, VideoAsset};

use crate::collaborators::{
    CaptionWriter, Collaborators, LabelCaptionWriter, MomentDetector, NarrationSynthesizer,
};
use crate::error::{CollaboratorError, WorkerError, WorkerResult};
use crate::pipeline::RunRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct RunManifest {
    pub source: PathBuf,
    #[serde(default)]
    pub run_id: Option<String>,
    /// Raw moment-detector records
    #[serde(default)]
    pub moments: Vec<Value>,
    #[serde(default)]
    pub narration: Option<PathBuf>,
    #[serde(default)]
    pub caption: Option<CaptionRecord>,
    /// Meme preset name; unknown names fall back to square
    #[serde(default)]
    pub format: Option<String>,
}

impl RunManifest {
    /// Read and parse a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let manifest = Self::parse(&raw)
            .map_err(|e| WorkerError::config_error(format!("invalid manifest {}: {}", path.display(), e)))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(manifest.resolve(base))
    }

    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn resolve(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.source = resolve(self.source);
        self.narration = self.narration.map(resolve);
        self
    }

    /// The run this manifest describes.
    ///
    /// A blank `run_id` gets a generated one; any other id must be a single
    /// safe path component.
    pub fn request(&self) -> WorkerResult<RunRequest> {
        let mut request = RunRequest::new(&self.source);
        if let Some(id) = self.run_id.as_deref().filter(|s| !s.trim().is_empty()) {
            let run_id = RunId::parse(id).map_err(|e| WorkerError::config_error(e.to_string()))?;
            request = request.with_run_id(run_id);
        }
        if let Some(format) = &self.format {
            request = request.with_format(MemeFormat::from_name(format));
        }
        Ok(request)
    }

    /// Collaborators answering from this manifest.
    ///
    /// Without a caption record the interval's label and reason are used.
    pub fn collaborators(&self) -> Collaborators {
        let caption_writer: Arc<dyn CaptionWriter> = match &self.caption {
            Some(record) => Arc::new(FixedCaption(record.clone())),
            None => Arc::new(LabelCaptionWriter),
        };
        let collaborators = Collaborators::new(Arc::new(RecordedMoments(self.moments.clone())), caption_writer);
        match &self.narration {
            Some(path) => collaborators.with_narrator(Arc::new(NarrationFile(path.clone()))),
            None => collaborators,
        }
    }
}

/// Moment detector replaying stored records.
#[derive(Debug, Clone)]
pub struct RecordedMoments(pub Vec<Value>);

#[async_trait]
impl MomentDetector for RecordedMoments {
    async fn detect(&self, _video: &VideoAsset, _limits: DurationLimits) -> Result<Vec<Value>, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Caption writer returning the same record for every frame.
#[derive(Debug, Clone)]
pub struct FixedCaption(pub CaptionRecord);

#[async_trait]
impl CaptionWriter for FixedCaption {
    async fn write_caption(&self, _frame: &Frame, _interval: &TimeInterval) -> Result<CaptionRecord, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Narration synthesized ahead of time.
#[derive(Debug, Clone)]
pub struct NarrationFile(pub PathBuf);

#[async_trait]
impl NarrationSynthesizer for NarrationFile {
    async fn synthesize(
        &self,
        _clip: &VideoAsset,
        _interval: &TimeInterval,
        _destination: &Path,
    ) -> Result<PathBuf, CollaboratorError> {
        if !tokio::fs::try_exists(&self.0).await? {
            return Err(CollaboratorError::unavailable(
                "narration synthesizer",
                format!("{} does not exist", self.0.display()),
            ));
        }
        debug!(path = %self.0.display(), "Using pre-synthesized narration");
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::Caption;
    use tempfile::TempDir;

    fn video() -> VideoAsset {
        VideoAsset {
            path: PathBuf::from("/tmp/clip.mp4"),
            duration: 8.0,
            fps: 30.0,
            width: 160,
            height: 120,
            frame_count: 240,
            has_audio: false,
        }
    }

    #[tokio::test]
    async fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("run.json");
        std::fs::write(
            &manifest_path,
            r#"{
                "source": "in/cat.mp4",
                "run_id": "cat01",
                "moments": [{"start": 1, "end": 9, "score": 7}],
                "narration": "/abs/voice.mp3",
                "caption": {"template": "quote", "caption": "it me"},
                "format": "tall"
            }"#,
        )
        .unwrap();

        let manifest = RunManifest::load(&manifest_path).await.unwrap();
        assert_eq!(manifest.source, dir.path().join("in/cat.mp4"));
        assert_eq!(manifest.narration, Some(PathBuf::from("/abs/voice.mp3")));

        let request = manifest.request().unwrap();
        assert_eq!(request.run_id.as_str(), "cat01");
        assert_eq!(request.meme_format, Some(MemeFormat::Tall));
        assert_eq!(
            manifest.caption.clone().unwrap().into_caption(),
            Caption::quote("it me")
        );
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"moments": []}"#).unwrap();

        let err = RunManifest::load(&path).await.unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_collaborators_replay_manifest() {
        let manifest = RunManifest::parse(r#"{"source": "/v.mp4", "moments": [{"start": 0, "end": 8}, "junk"]}"#).unwrap();
        let collaborators = manifest.collaborators();

        let records = collaborators
            .detector
            .detect(&video(), DurationLimits::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert!(collaborators.narrator.is_none());
        assert!(manifest.request().unwrap().meme_format.is_none());
    }

    #[test]
    fn test_unsafe_run_id_is_config_error() {
        for id in ["../../escaped", "a/b", "run.1"] {
            let raw = format!(r#"{{"source": "/v.mp4", "run_id": "{}"}}"#, id);
            let manifest = RunManifest::parse(&raw).unwrap();
            let err = manifest.request().unwrap_err();
            assert!(matches!(err, WorkerError::ConfigError(_)), "{}", id);
        }

        let blank = RunManifest::parse(r#"{"source": "/v.mp4", "run_id": "  "}"#).unwrap();
        assert!(blank.request().unwrap().run_id.is_valid());
    }

    #[tokio::test]
    async fn test_missing_narration_file_is_unavailable() {
        let narrator = NarrationFile(PathBuf::from("/definitely/not/here.mp3"));
        let err = narrator
            .synthesize(&video(), &TimeInterval::new(0.0, 8.0, 5), Path::new("/tmp/n.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
    }
}
