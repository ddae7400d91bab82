//! Highlight pipeline orchestration.
//!
//! This crate provides:
//! - Pipeline configuration from the environment
//! - Collaborator boundaries (moment detection, captions, narration)
//! - The sequential highlight pipeline with stage-boundary cancellation
//! - A keyed store of finished runs for meme re-rendering
//! - Manifest-driven collaborators for the `reelcut-worker` binary
//! - Structured run logging and metrics

pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod pipeline;
pub mod run_store;

pub use collaborators::{CaptionWriter, Collaborators, LabelCaptionWriter, MomentDetector, NarrationSynthesizer};
pub use config::PipelineConfig;
pub use error::{CollaboratorError, WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use manifest::RunManifest;
pub use pipeline::{HighlightPipeline, MemeRender, RunReport, RunRequest};
pub use run_store::{ArtifactUrls, RunArtifacts, RunStore};
