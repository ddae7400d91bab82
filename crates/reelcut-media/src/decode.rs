//! Decoding through FFmpeg pipes.
//!
//! Video is decoded to packed `rgb24` and read one frame at a time, so a
//! caller that stops early never pays for the rest of the file. Audio is
//! decoded to interleaved `f32le` at a fixed rate and layout for mixing.

use std::path::Path;

use image::RgbImage;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tracing::debug;

use reelcut_models::VideoAsset;

use crate::command::{stderr_tail, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Sequential reader over the decoded frames of one video.
///
/// One pass only: frames come out in presentation order and cannot be
/// rewound. Dropping the reader kills the decoder.
pub struct RawFrameReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    source: std::path::PathBuf,
    width: u32,
    height: u32,
    frame_len: usize,
    frames_read: u64,
}

impl RawFrameReader {
    /// Start decoding `asset` from its beginning.
    pub fn open(asset: &VideoAsset, runner: &FfmpegRunner) -> MediaResult<Self> {
        Self::open_at(asset, None, runner)
    }

    /// Start decoding at `seek` seconds (first frame at or after it).
    pub fn open_at(asset: &VideoAsset, seek: Option<f64>, runner: &FfmpegRunner) -> MediaResult<Self> {
        if asset.width == 0 || asset.height == 0 {
            return Err(MediaError::source_unreadable(&asset.path, "video has no dimensions"));
        }

        let mut cmd = FfmpegCommand::new(&asset.path, "pipe:1");
        if let Some(seconds) = seek {
            cmd = cmd.seek(seconds.max(0.0));
        }
        let cmd = cmd
            .no_audio()
            .output_args(["-vsync", "passthrough"])
            .raw_rgb_output();

        let mut child = runner.spawn_reader(&cmd)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::source_unreadable(&asset.path, "decoder stdout unavailable"))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        debug!(
            path = %asset.path.display(),
            seek = ?seek,
            width = asset.width,
            height = asset.height,
            "Opened raw frame decoder"
        );

        Ok(Self {
            child,
            stdout: BufReader::with_capacity(asset.rgb_frame_len().max(8192), stdout),
            stderr_task,
            source: asset.path.clone(),
            width: asset.width,
            height: asset.height,
            frame_len: asset.rgb_frame_len(),
            frames_read: 0,
        })
    }

    /// Number of frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Next decoded frame, or `None` once the stream is exhausted.
    ///
    /// If the decoder produced nothing at all and exited with an error, the
    /// source is reported unreadable.
    pub async fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let mut buf = vec![0u8; self.frame_len];
        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => {
                self.frames_read += 1;
                let frame = RgbImage::from_raw(self.width, self.height, buf).ok_or_else(|| {
                    MediaError::source_unreadable(&self.source, "decoded frame has unexpected size")
                })?;
                Ok(Some(frame))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finish_stream().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn finish_stream(&mut self) -> MediaResult<()> {
        let status = self.child.wait().await?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() && self.frames_read == 0 {
            return Err(MediaError::source_unreadable(
                &self.source,
                format!("decoder failed: {}", stderr_tail(&stderr)),
            ));
        }
        Ok(())
    }

    /// Stop decoding early.
    pub async fn close(mut self) {
        let _ = self.child.kill().await;
    }
}

/// Interleaved f32 PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Interleaved samples per second of audio.
    pub fn samples_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize
    }

    pub fn duration(&self) -> f64 {
        let per_second = self.samples_per_second();
        if per_second == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / per_second as f64
    }

    /// Interleaved sample count covering `seconds`, rounded down to a whole frame.
    pub fn samples_for(&self, seconds: f64) -> usize {
        let frames = (seconds.max(0.0) * self.sample_rate as f64).floor() as usize;
        frames * self.channels as usize
    }

    /// Little-endian bytes for feeding back to FFmpeg as `f32le`.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn from_le_bytes(bytes: &[u8], sample_rate: u32, channels: u16) -> Self {
        let samples = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self::new(samples, sample_rate, channels)
    }
}

/// Decode the first audio stream of any container to PCM.
pub async fn decode_pcm(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    runner: &FfmpegRunner,
) -> MediaResult<PcmBuffer> {
    let cmd = FfmpegCommand::new(path, "pipe:1")
        .no_video()
        .map("0:a:0")
        .raw_pcm_output(sample_rate, channels);

    let bytes = runner.capture(&cmd).await?;
    let pcm = PcmBuffer::from_le_bytes(&bytes, sample_rate, channels);

    debug!(
        path = %path.display(),
        samples = pcm.samples.len(),
        duration = pcm.duration(),
        "Decoded PCM"
    );
    Ok(pcm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_byte_roundtrip() {
        let pcm = PcmBuffer::new(vec![0.0, 0.5, -0.25, 1.0], 48_000, 2);
        let back = PcmBuffer::from_le_bytes(&pcm.to_le_bytes(), 48_000, 2);
        assert_eq!(back, pcm);
    }

    #[test]
    fn test_pcm_timing() {
        let pcm = PcmBuffer::new(vec![0.0; 96_000], 48_000, 2);
        assert!((pcm.duration() - 1.0).abs() < 1e-9);
        assert_eq!(pcm.samples_for(0.5), 48_000);
        assert_eq!(pcm.samples_for(-1.0), 0);
    }

    #[test]
    fn test_trailing_partial_sample_ignored() {
        let pcm = PcmBuffer::from_le_bytes(&[0, 0, 128, 63, 1, 2], 8_000, 1);
        assert_eq!(pcm.samples, vec![1.0]);
    }
}
