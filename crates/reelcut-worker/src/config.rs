//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use reelcut_media::{ComposeOptions, FfmpegRunner};
use reelcut_models::{DurationLimits, EncodingConfig, MemeFormat};
use reelcut_storage::StorageConfig;

use crate::error::{WorkerError, WorkerResult};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent of the per-run scratch directories
    pub work_dir: PathBuf,
    /// Where finished artifacts are committed
    pub output_dir: PathBuf,
    /// Reconciler clip length limits
    pub limits: DurationLimits,
    /// Longest source accepted, in seconds
    pub max_source_secs: f64,
    /// Frame sampling rate (output frames per second)
    pub sample_fps: f64,
    /// Mix the attenuated original audio under the narration
    pub keep_original_audio: bool,
    /// Gain applied to the original audio when mixed
    pub original_gain: f32,
    /// Meme output preset
    pub meme_format: MemeFormat,
    /// Preferred font file for captions
    pub font_path: Option<PathBuf>,
    /// Timeout for a single FFmpeg invocation
    pub ffmpeg_timeout: Duration,
    /// Concurrent pipeline runs in the binary
    pub max_concurrent_runs: usize,
    /// How long finished runs stay in the run store
    pub run_ttl: Duration,
    /// Fixed encoding profile
    pub encoding: EncodingConfig,
    /// Artifact store selection
    pub storage: StorageConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reelcut"),
            output_dir: PathBuf::from("/tmp/reelcut/out"),
            limits: DurationLimits::default(),
            max_source_secs: 120.0,
            sample_fps: 1.0,
            keep_original_audio: true,
            original_gain: reelcut_media::compose::DEFAULT_ORIGINAL_GAIN,
            meme_format: MemeFormat::default(),
            font_path: None,
            ffmpeg_timeout: Duration::from_secs(600),
            max_concurrent_runs: 2,
            run_ttl: Duration::from_secs(3600), // 1 hour
            encoding: EncodingConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("REELCUT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("REELCUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            limits: DurationLimits {
                min_duration: std::env::var("REELCUT_MIN_CLIP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.limits.min_duration),
                max_duration: std::env::var("REELCUT_MAX_CLIP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.limits.max_duration),
            },
            max_source_secs: std::env::var("REELCUT_MAX_SOURCE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_source_secs),
            sample_fps: std::env::var("REELCUT_SAMPLE_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sample_fps),
            keep_original_audio: std::env::var("REELCUT_KEEP_ORIGINAL_AUDIO")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.keep_original_audio),
            original_gain: std::env::var("REELCUT_ORIGINAL_GAIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.original_gain),
            meme_format: std::env::var("REELCUT_MEME_FORMAT")
                .map(|s| MemeFormat::from_name(&s))
                .unwrap_or(defaults.meme_format),
            font_path: std::env::var("REELCUT_FONT_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("REELCUT_FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            max_concurrent_runs: std::env::var("REELCUT_MAX_CONCURRENT_RUNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_runs),
            run_ttl: Duration::from_secs(
                std::env::var("REELCUT_RUN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            encoding: defaults.encoding,
            storage: StorageConfig::from_env(),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        let DurationLimits {
            min_duration,
            max_duration,
        } = self.limits;
        if !(min_duration > 0.0) {
            return Err(WorkerError::config_error(format!(
                "minimum clip length must be positive, got {}",
                min_duration
            )));
        }
        if max_duration < min_duration {
            return Err(WorkerError::config_error(format!(
                "maximum clip length {} is below the minimum {}",
                max_duration, min_duration
            )));
        }
        if !(self.sample_fps > 0.0) {
            return Err(WorkerError::config_error("sample rate must be positive"));
        }
        if !(self.max_source_secs > 0.0) {
            return Err(WorkerError::config_error("maximum source length must be positive"));
        }
        if self.ffmpeg_timeout.as_secs() == 0 {
            return Err(WorkerError::config_error("FFmpeg timeout must be at least one second"));
        }
        if self.max_concurrent_runs == 0 {
            return Err(WorkerError::config_error("at least one concurrent run is required"));
        }
        Ok(())
    }

    /// Composer options derived from the audio settings.
    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions::new(self.keep_original_audio, self.original_gain)
    }

    /// FFmpeg runner with the configured timeout.
    pub fn ffmpeg_runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.ffmpeg_timeout.as_secs())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
