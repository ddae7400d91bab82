//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure reported by an external collaborator (moment detector, caption
/// writer or narration synthesizer).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} returned malformed output: {message}")]
    Malformed {
        collaborator: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CollaboratorError {
    pub fn unavailable(collaborator: &'static str, msg: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator,
            message: msg.into(),
        }
    }

    pub fn malformed(collaborator: &'static str, msg: impl Into<String>) -> Self {
        Self::Malformed {
            collaborator,
            message: msg.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Reconciliation left no usable interval. Terminal for the request.
    #[error("No highlight found")]
    NoHighlight,

    #[error("Source is {duration:.1}s long, the limit is {max:.1}s")]
    SourceTooLong { duration: f64, max: f64 },

    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Another run already published under this id.
    #[error("Run directory already exists: {}", .0.display())]
    RunExists(PathBuf),

    #[error("Frame index {index} out of range, run has {available} frames")]
    InvalidFrameIndex { index: usize, available: usize },

    #[error("Run cancelled before {0}")]
    Cancelled(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] reelcut_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] reelcut_storage::StorageError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Media failures never are: a corrupt or unsupported file fails the
    /// same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Storage(e) => e.is_retryable(),
            WorkerError::Collaborator(CollaboratorError::Unavailable { .. }) => true,
            _ => false,
        }
    }

    /// Short machine-readable kind for reports and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::NoHighlight => "no_highlight",
            WorkerError::SourceTooLong { .. } => "source_too_long",
            WorkerError::RunNotFound(_) => "run_not_found",
            WorkerError::RunExists(_) => "run_exists",
            WorkerError::InvalidFrameIndex { .. } => "invalid_frame_index",
            WorkerError::Cancelled(_) => "cancelled",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Media(e) if e.is_source_problem() => "source",
            WorkerError::Media(_) => "media",
            WorkerError::Storage(_) => "storage",
            WorkerError::Collaborator(_) => "collaborator",
            WorkerError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_media::MediaError;

    #[test]
    fn test_media_errors_are_not_retryable() {
        let err: WorkerError = MediaError::source_unreadable("/tmp/in.mp4", "moov atom not found").into();
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "source");

        let err: WorkerError = MediaError::encode_failure("/tmp/out.mp4", "exit 1").into();
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "media");
    }

    #[test]
    fn test_unavailable_collaborator_is_retryable() {
        let err: WorkerError = CollaboratorError::unavailable("moment detector", "503").into();
        assert!(err.is_retryable());
        assert!(!WorkerError::NoHighlight.is_retryable());
    }

    #[test]
    fn test_existing_run_directory_is_terminal() {
        let err = WorkerError::RunExists(PathBuf::from("/tmp/out/cat01"));
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "run_exists");
        assert!(err.to_string().contains("/tmp/out/cat01"));
    }
}
