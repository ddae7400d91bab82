//! Clip extraction.
//!
//! Cuts `[start, end)` out of a source into a new standalone file. Audio is
//! cut into an intermediate file inside the run's scratch directory first
//! and muxed with the re-encoded video; the intermediate is deleted when the
//! call returns, whatever the outcome.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use reelcut_models::{EncodingConfig, VideoAsset};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::StagedOutput;
use crate::probe::probe_video;
use crate::scratch::ScratchDir;

/// A range already clamped to its source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub start: f64,
    pub end: f64,
}

impl ClipRange {
    /// Clamp `[start, end)` into `[0, source_duration]`.
    ///
    /// Fails with `InvalidRange` if nothing is left.
    pub fn clamp(start: f64, end: f64, source_duration: f64) -> MediaResult<Self> {
        let clamped_start = start.max(0.0);
        let clamped_end = end.min(source_duration);
        if !(clamped_start.is_finite() && clamped_end.is_finite()) || clamped_end <= clamped_start {
            return Err(MediaError::InvalidRange {
                start: clamped_start,
                end: clamped_end,
            });
        }
        Ok(Self {
            start: clamped_start,
            end: clamped_end,
        })
    }

    /// Declared length of the clip in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Output of [`ClipExtractor::extract`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClip {
    /// Probed metadata of the written file
    pub asset: VideoAsset,
    /// Range of the source it was cut from
    pub range: ClipRange,
}

impl ExtractedClip {
    /// Declared duration (the requested range, not the probed one).
    pub fn duration(&self) -> f64 {
        self.range.duration()
    }
}

/// Cuts sub-ranges of a source video into new files.
#[derive(Debug, Clone)]
pub struct ClipExtractor {
    runner: FfmpegRunner,
    encoding: EncodingConfig,
}

impl ClipExtractor {
    pub fn new(runner: FfmpegRunner, encoding: EncodingConfig) -> Self {
        Self { runner, encoding }
    }

    /// Extract `[start, end)` of `source` into `destination`.
    ///
    /// `destination` only appears once the encode has fully succeeded.
    pub async fn extract(
        &self,
        source: &VideoAsset,
        start: f64,
        end: f64,
        destination: impl AsRef<Path>,
        scratch: &ScratchDir,
    ) -> MediaResult<ExtractedClip> {
        let destination = destination.as_ref();
        let range = ClipRange::clamp(start, end, source.duration)?;

        info!(
            source = %source.path.display(),
            output = %destination.display(),
            start = range.start,
            end = range.end,
            "Extracting clip"
        );

        let audio = if source.has_audio {
            let audio = scratch.temp_file("clip-audio-", ".m4a")?;
            let cmd = FfmpegCommand::new(&source.path, audio.path())
                .seek(range.start)
                .duration(range.duration())
                .no_video()
                .map("0:a:0")
                .audio_encoding(&self.encoding);
            self.runner.run(&cmd).await?;
            Some(audio)
        } else {
            None
        };

        let staged = StagedOutput::new(destination)?;
        let mut cmd = FfmpegCommand::new(&source.path, staged.path())
            .seek(range.start)
            .duration(range.duration());

        cmd = match &audio {
            Some(audio) => cmd
                .add_input(audio.path())
                .map("0:v:0")
                .map("1:a:0")
                .video_encoding(&self.encoding)
                .audio_codec("copy"),
            None => cmd.map("0:v:0").video_encoding(&self.encoding),
        };
        let cmd = cmd
            .output_duration(range.duration())
            .output_args(["-movflags", "+faststart"]);

        self.runner
            .run(&cmd)
            .await
            .map_err(|e| e.for_output(destination))?;
        drop(audio);

        let committed = staged.commit()?;
        let asset = probe_video(&committed).await?;

        info!(
            output = %committed.display(),
            duration = asset.duration,
            frames = asset.frame_count,
            "Clip extracted"
        );
        Ok(ExtractedClip { asset, range })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamped_to_source() {
        let range = ClipRange::clamp(-3.0, 45.0, 30.0).unwrap();
        assert_eq!((range.start, range.end), (0.0, 30.0));
    }

    #[test]
    fn test_declared_duration_is_stable() {
        let a = ClipRange::clamp(2.0, 10.0, 30.0).unwrap();
        let b = ClipRange::clamp(2.0, 10.0, 30.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.duration(), 8.0);
    }

    #[test]
    fn test_empty_or_inverted_range_rejected() {
        for (s, e, d) in [(5.0, 5.0, 30.0), (10.0, 2.0, 30.0), (31.0, 40.0, 30.0), (0.0, 4.0, 0.0)] {
            let err = ClipRange::clamp(s, e, d).unwrap_err();
            assert!(matches!(err, MediaError::InvalidRange { .. }), "{} {} {}", s, e, d);
        }
    }
}
