//! Narration compositing.
//!
//! The video's length is authoritative: narration longer than the video is
//! cut, shorter narration is followed by silence (or by the attenuated
//! original audio, when that is kept).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use reelcut_models::encoding::{MIX_CHANNELS, MIX_SAMPLE_RATE};
use reelcut_models::{AudioTrack, EncodingConfig, VideoAsset};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::decode::{decode_pcm, PcmBuffer};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::StagedOutput;
use crate::mix::{mix, pad_to, scaled, truncate_to};
use crate::probe::probe_video;
use crate::scratch::ScratchDir;

/// Gain applied to the original soundtrack when it is kept.
pub const DEFAULT_ORIGINAL_GAIN: f32 = 0.15;

/// How the original soundtrack is treated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComposeOptions {
    pub keep_original: bool,
    /// Linear gain in [0, 1] for the original soundtrack
    pub original_gain: f32,
}

impl ComposeOptions {
    pub fn new(keep_original: bool, original_gain: f32) -> Self {
        let original_gain = if original_gain.is_nan() {
            0.0
        } else {
            original_gain.clamp(0.0, 1.0)
        };
        Self {
            keep_original,
            original_gain,
        }
    }

    pub fn narration_only() -> Self {
        Self::new(false, 0.0)
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self::new(true, DEFAULT_ORIGINAL_GAIN)
    }
}

/// Build the output soundtrack from decoded PCM.
///
/// `original` is ignored unless `options.keep_original` is set. The result
/// is exactly `video_duration` long.
pub fn composite_track(
    mut narration: PcmBuffer,
    original: Option<&PcmBuffer>,
    options: ComposeOptions,
    video_duration: f64,
) -> PcmBuffer {
    truncate_to(&mut narration, video_duration);

    let mut composite = match original {
        Some(original) if options.keep_original => {
            let quiet = scaled(original, options.original_gain);
            let mut mixed = mix(&narration, &quiet);
            truncate_to(&mut mixed, video_duration);
            mixed
        }
        _ => narration,
    };

    pad_to(&mut composite, video_duration);
    composite
}

/// Replaces a video's soundtrack with narration, optionally over the
/// attenuated original.
#[derive(Debug, Clone)]
pub struct AudioVideoComposer {
    runner: FfmpegRunner,
    encoding: EncodingConfig,
}

impl AudioVideoComposer {
    pub fn new(runner: FfmpegRunner, encoding: EncodingConfig) -> Self {
        Self { runner, encoding }
    }

    pub async fn compose(
        &self,
        video: &VideoAsset,
        narration: &AudioTrack,
        options: ComposeOptions,
        destination: impl AsRef<Path>,
        scratch: &ScratchDir,
    ) -> MediaResult<VideoAsset> {
        let destination = destination.as_ref();
        if video.duration <= 0.0 {
            return Err(MediaError::source_unreadable(&video.path, "video has no duration"));
        }

        let mut narration_pcm = decode_pcm(&narration.path, MIX_SAMPLE_RATE, MIX_CHANNELS, &self.runner).await?;
        if narration.gain < 1.0 {
            narration_pcm = scaled(&narration_pcm, narration.gain);
        }
        if narration_pcm.duration() > video.duration {
            info!(
                narration = narration_pcm.duration(),
                video = video.duration,
                "Truncating narration to video length"
            );
        }

        let original = if options.keep_original && video.has_audio {
            Some(decode_pcm(&video.path, MIX_SAMPLE_RATE, MIX_CHANNELS, &self.runner).await?)
        } else {
            None
        };

        let composite = composite_track(narration_pcm, original.as_ref(), options, video.duration);

        let mix_file = scratch.temp_file("mix-", ".f32le")?;
        tokio::fs::write(mix_file.path(), composite.to_le_bytes()).await?;

        let staged = StagedOutput::new(destination)?;
        let cmd = FfmpegCommand::new(&video.path, staged.path())
            .add_input(mix_file.path())
            .input_format("f32le")
            .input_arg("-ar")
            .input_arg(MIX_SAMPLE_RATE.to_string())
            .input_arg("-ac")
            .input_arg(MIX_CHANNELS.to_string())
            .map("0:v:0")
            .map("1:a:0")
            .video_encoding(&self.encoding)
            .audio_encoding(&self.encoding)
            .output_duration(video.duration)
            .output_args(["-movflags", "+faststart"]);

        self.runner
            .run(&cmd)
            .await
            .map_err(|e| e.for_output(destination))?;
        drop(mix_file);

        let committed = staged.commit()?;
        let asset = probe_video(&committed).await?;

        info!(
            output = %committed.display(),
            duration = asset.duration,
            kept_original = original.is_some(),
            "Composed narrated video"
        );
        Ok(asset)
    }
}
