//! Evenly spaced frame sampling.

use image::RgbImage;
use tracing::{debug, info};

use reelcut_models::VideoAsset;

use crate::command::FfmpegRunner;
use crate::decode::RawFrameReader;
use crate::error::MediaResult;
use crate::still::{encode_still, StillFormat};

/// A decoded still taken from a video.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Source frame index
    pub index: u64,
    /// Presentation time in seconds (`index / fps`)
    pub timestamp: f64,
    /// RGB pixels
    pub image: RgbImage,
    /// Compressed copy of `image`
    pub encoded: Vec<u8>,
    pub format: StillFormat,
}

impl Frame {
    /// Build a frame and its compressed copy.
    pub fn encode(index: u64, timestamp: f64, image: RgbImage, format: StillFormat) -> MediaResult<Self> {
        let encoded = encode_still(&image, format)?;
        Ok(Self {
            index,
            timestamp,
            image,
            encoded,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Which source frames a sampling pass keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePlan {
    /// Keep every `stride`-th source frame, starting at frame 0
    pub stride: u64,
    pub max_frames: usize,
}

impl SamplePlan {
    /// `stride = round(source_fps / rate)`, at least 1. A non-positive or
    /// non-finite rate samples once per second.
    pub fn new(source_fps: f64, rate: f64, max_frames: usize) -> Self {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        let ratio = source_fps / rate;
        let stride = if ratio.is_finite() {
            (ratio.round() as u64).max(1)
        } else {
            1
        };
        Self { stride, max_frames }
    }

    pub fn keeps(&self, frame_index: u64) -> bool {
        frame_index % self.stride == 0
    }

    /// Frame indices this plan selects from a source of `frame_count` frames.
    pub fn indices(&self, frame_count: u64) -> impl Iterator<Item = u64> + '_ {
        (0..frame_count)
            .step_by(self.stride as usize)
            .take(self.max_frames)
    }
}

/// Pulls stills out of a video at a target output rate.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    runner: FfmpegRunner,
    format: StillFormat,
}

impl FrameSampler {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self {
            runner,
            format: StillFormat::FRAME,
        }
    }

    pub fn with_format(mut self, format: StillFormat) -> Self {
        self.format = format;
        self
    }

    /// Sample `asset` at `rate` frames per second of output, keeping at
    /// most `max_frames`.
    ///
    /// Decoding is a single forward pass that stops as soon as the cap is
    /// reached. A source that cannot be opened fails with `SourceUnreadable`.
    pub async fn sample(&self, asset: &VideoAsset, rate: f64, max_frames: usize) -> MediaResult<Vec<Frame>> {
        let plan = SamplePlan::new(asset.fps, rate, max_frames);
        if plan.max_frames == 0 {
            return Ok(Vec::new());
        }

        let mut reader = RawFrameReader::open(asset, &self.runner)?;
        let mut frames = Vec::with_capacity(plan.max_frames.min(256));
        let mut index: u64 = 0;

        while let Some(image) = reader.next_frame().await? {
            if plan.keeps(index) {
                let frame = Frame::encode(index, asset.timestamp_of(index), image, self.format)?;
                debug!(index = frame.index, timestamp = frame.timestamp, "Sampled frame");
                frames.push(frame);
                if frames.len() >= plan.max_frames {
                    reader.close().await;
                    break;
                }
            }
            index += 1;
        }

        info!(
            path = %asset.path.display(),
            stride = plan.stride,
            frames = frames.len(),
            "Sampled frames"
        );
        Ok(frames)
    }
}
