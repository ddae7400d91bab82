//! Shared data models for the Reelcut highlight pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Candidate and reconciled highlight intervals
//! - Probed video and audio asset metadata
//! - Caption templates and meme output presets
//! - Encoding configuration
//! - Run identifiers

pub mod asset;
pub mod caption;
pub mod encoding;
pub mod interval;
pub mod run;

// Re-export common types
pub use asset::{AudioTrack, VideoAsset};
pub use caption::{Caption, CaptionRecord, MemeFormat, TemplateKind};
pub use encoding::EncodingConfig;
pub use interval::{DurationLimits, ModelError, TimeInterval};
pub use run::RunId;
