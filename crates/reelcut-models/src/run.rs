//! Pipeline run identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::interval::ModelError;

/// Longest run id accepted from callers.
pub const MAX_RUN_ID_LEN: usize = 64;

/// Unique identifier for one pipeline run.
///
/// Generated ids are twelve lowercase hex characters. Caller-supplied ids go
/// through [`RunId::parse`], since the id names the run's scratch and output
/// directories and must stay a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..12].to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Accept a caller-supplied id if it is 1-64 characters of
    /// `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        let id = Self(s.to_string());
        if id.is_valid() {
            Ok(id)
        } else {
            Err(ModelError::InvalidRunId(s.to_string()))
        }
    }

    /// Whether the id is safe to use as a directory name.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_RUN_ID_LEN
            && self.0.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
