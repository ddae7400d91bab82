//! External collaborator boundaries.
//!
//! Moment detection, caption writing and narration synthesis live outside
//! the media core. The pipeline depends only on these contracts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use reelcut_media::Frame;
use reelcut_models::{CaptionRecord, DurationLimits, TimeInterval, VideoAsset};

use crate::error::CollaboratorError;

/// Suggests highlight intervals for a video.
///
/// Records are returned raw. Numeric well-formedness is checked by the
/// reconciler; semantic correctness is never checked.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MomentDetector: Send + Sync {
    async fn detect(&self, video: &VideoAsset, limits: DurationLimits) -> Result<Vec<Value>, CollaboratorError>;
}

/// Writes a caption for a sampled frame of the chosen interval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionWriter: Send + Sync {
    async fn write_caption(&self, frame: &Frame, interval: &TimeInterval) -> Result<CaptionRecord, CollaboratorError>;
}

/// Produces a narration audio file for a clip.
///
/// The returned file must be decodable as a standard audio container and of
/// finite duration. It may or may not be `destination`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        clip: &VideoAsset,
        interval: &TimeInterval,
        destination: &Path,
    ) -> Result<PathBuf, CollaboratorError>;
}

/// The set of collaborators one pipeline run talks to.
///
/// Without a narrator the composer stage is skipped and the extracted clip
/// is published as is.
#[derive(Clone)]
pub struct Collaborators {
    pub detector: Arc<dyn MomentDetector>,
    pub caption_writer: Arc<dyn CaptionWriter>,
    pub narrator: Option<Arc<dyn NarrationSynthesizer>>,
}

impl Collaborators {
    pub fn new(detector: Arc<dyn MomentDetector>, caption_writer: Arc<dyn CaptionWriter>) -> Self {
        Self {
            detector,
            caption_writer,
            narrator: None,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrationSynthesizer>) -> Self {
        self.narrator = Some(narrator);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("narrator", &self.narrator.is_some())
            .finish_non_exhaustive()
    }
}

/// Caption writer that reuses the interval's own label and reason.
///
/// Used when no caption collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelCaptionWriter;

#[async_trait]
impl CaptionWriter for LabelCaptionWriter {
    async fn write_caption(&self, _frame: &Frame, interval: &TimeInterval) -> Result<CaptionRecord, CollaboratorError> {
        let text = |s: &str| Some(s.trim().to_string()).filter(|t| !t.is_empty());
        Ok(CaptionRecord {
            template: Some("classic".to_string()),
            top_text: text(&interval.label),
            bottom_text: text(&interval.reason),
            body_text: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use reelcut_media::StillFormat;
    use reelcut_models::Caption;

    #[tokio::test]
    async fn test_label_caption_writer() {
        let frame = Frame::encode(0, 0.0, RgbImage::new(4, 4), StillFormat::LOSSLESS).unwrap();
        let interval = TimeInterval::new(1.0, 9.0, 7).with_label("the fall").with_reason(" ");

        let record = LabelCaptionWriter.write_caption(&frame, &interval).await.unwrap();
        assert_eq!(
            record.into_caption(),
            Caption::Classic {
                top_text: Some("the fall".to_string()),
                bottom_text: None,
            }
        );
    }
}
