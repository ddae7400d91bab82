#![deny(unreachable_patterns)]
//! Deterministic media pipeline for highlight clips.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a timeout-aware runner
//! - FFprobe metadata for video and audio sources
//! - Lazy raw-frame decoding and PCM decoding over FFmpeg pipes
//! - Interval reconciliation, frame sampling, clip extraction,
//!   narration compositing and thumbnails
//! - Caption rendering with three layout templates
//! - Per-run scratch directories and atomically committed outputs

pub mod caption;
pub mod clip;
pub mod command;
pub mod compose;
pub mod decode;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod metric_names;
pub mod mix;
pub mod probe;
pub mod reconcile;
pub mod scratch;
pub mod still;
pub mod thumbnail;

pub use caption::{CaptionRenderer, Typeface};
pub use clip::{ClipExtractor, ClipRange, ExtractedClip};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{AudioVideoComposer, ComposeOptions};
pub use decode::{decode_pcm, PcmBuffer, RawFrameReader};
pub use error::{MediaError, MediaResult};
pub use frames::{Frame, FrameSampler, SamplePlan};
pub use fs_utils::{move_file, write_atomically, StagedOutput};
pub use probe::{probe_audio, probe_video};
pub use reconcile::IntervalReconciler;
pub use scratch::ScratchDir;
pub use still::{encode_still, StillFormat};
pub use thumbnail::ThumbnailExtractor;
