//! Thumbnail extraction.

use std::path::Path;

use tracing::{debug, info};

use reelcut_models::VideoAsset;

use crate::command::FfmpegRunner;
use crate::decode::RawFrameReader;
use crate::error::{MediaError, MediaResult};
use crate::frames::Frame;
use crate::fs_utils::write_atomically;
use crate::still::StillFormat;

/// Default thumbnail position as a fraction of the duration.
pub const DEFAULT_POSITION: f64 = 0.25;

/// How far before the end to start decoding when a seek comes back empty.
const TAIL_WINDOW_SECS: f64 = 2.0;

/// First frame at or after `timestamp`, clamped to the last frame.
pub fn frame_index_at(asset: &VideoAsset, timestamp: f64) -> u64 {
    let ts = if timestamp.is_nan() { 0.0 } else { timestamp.max(0.0) };
    let index = (ts * asset.fps - 1e-9).ceil().max(0.0) as u64;
    index.min(asset.last_frame_index())
}

/// Pulls one representative still out of a video.
#[derive(Debug, Clone)]
pub struct ThumbnailExtractor {
    runner: FfmpegRunner,
}

impl ThumbnailExtractor {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// Grab the frame at `timestamp` (default: a quarter of the way in) and
    /// write it losslessly to `destination`.
    pub async fn extract(
        &self,
        asset: &VideoAsset,
        timestamp: Option<f64>,
        destination: impl AsRef<Path>,
    ) -> MediaResult<Frame> {
        let destination = destination.as_ref();
        let requested = timestamp.unwrap_or(asset.duration * DEFAULT_POSITION);
        let index = frame_index_at(asset, requested);
        let seek = asset.timestamp_of(index);

        let mut reader = RawFrameReader::open_at(asset, Some(seek), &self.runner)?;
        let frame = match reader.next_frame().await? {
            Some(image) => {
                reader.close().await;
                Frame::encode(index, seek, image, StillFormat::LOSSLESS)?
            }
            None => {
                debug!(seek = seek, "Seek produced no frame, falling back to the tail");
                self.last_frame(asset).await?
            }
        };

        write_atomically(destination, &frame.encoded)?;

        info!(
            source = %asset.path.display(),
            output = %destination.display(),
            timestamp = frame.timestamp,
            "Thumbnail extracted"
        );
        Ok(frame)
    }

    async fn last_frame(&self, asset: &VideoAsset) -> MediaResult<Frame> {
        let start = (asset.duration - TAIL_WINDOW_SECS).max(0.0);
        let mut reader = RawFrameReader::open_at(asset, Some(start), &self.runner)?;

        let mut last = None;
        while let Some(image) = reader.next_frame().await? {
            last = Some(image);
        }

        let image = last.ok_or_else(|| MediaError::source_unreadable(&asset.path, "no decodable frames"))?;
        let index = asset.last_frame_index();
        Frame::encode(index, asset.timestamp_of(index), image, StillFormat::LOSSLESS)
    }
}
