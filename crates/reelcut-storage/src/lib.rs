//! Artifact storage for finished highlight outputs.
//!
//! This crate provides:
//! - The `ArtifactStore` upload boundary
//! - A bearer-token blob store over HTTP
//! - Local `file://` publishing and a mock-mode placeholder store
//! - Extension to content-type mapping

pub mod blob;
pub mod config;
pub mod content_type;
pub mod error;
pub mod local;
pub mod store;

pub use blob::{BlobStore, DEFAULT_BLOB_BASE_URL};
pub use config::StorageConfig;
pub use content_type::content_type_for;
pub use error::{StorageError, StorageResult};
pub use local::{LocalArtifactStore, PlaceholderStore};
pub use store::{unique_name, ArtifactStore};
