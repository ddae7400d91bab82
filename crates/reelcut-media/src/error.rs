//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
///
/// None of these are retried inside this crate; retrying a corrupt or
/// unsupported file does not change the outcome.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    /// File missing, corrupt or without the expected stream.
    #[error("Source unreadable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Requested range is empty or inverted after clamping.
    #[error("Invalid range: [{start:.3}s, {end:.3}s)")]
    InvalidRange { start: f64, end: f64 },

    /// One candidate record was malformed. Absorbed by the reconciler.
    #[error("Unparseable candidate #{index}: {reason}")]
    UnparseableCandidate { index: usize, reason: String },

    /// Encoding or writing an output failed.
    #[error("Encode failed for {path}: {message}")]
    EncodeFailure { path: PathBuf, message: String },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MediaError {
    /// Create a source-unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an encode failure carrying the attempted output path.
    pub fn encode_failure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::EncodeFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Output path an encode failure was writing to, for caller cleanup.
    pub fn attempted_output(&self) -> Option<&std::path::Path> {
        match self {
            Self::EncodeFailure { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Point an encode failure at `path` instead of the staging file it was
    /// writing. Other errors pass through.
    pub fn for_output(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::EncodeFailure { message, .. } => Self::EncodeFailure {
                path: path.into(),
                message,
            },
            other => other,
        }
    }

    /// Whether the failure is caused by the input media itself.
    pub fn is_source_problem(&self) -> bool {
        matches!(self, Self::SourceUnreadable { .. } | Self::InvalidRange { .. })
    }
}
