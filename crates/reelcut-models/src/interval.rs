//! Highlight interval models.
//!
//! Candidate intervals arrive from the moment-detector collaborator as loose
//! JSON records. [`TimeInterval::from_record`] performs the numeric
//! well-formedness check; nothing here judges whether a moment is any good.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Score assigned when a record omits one.
pub const DEFAULT_SCORE: u8 = 5;
/// Lowest accepted score.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted score.
pub const MAX_SCORE: u8 = 10;

/// Errors produced while reading loosely-typed collaborator records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("invalid run id {0:?}: expected 1-64 characters of [A-Za-z0-9_-]")]
    InvalidRunId(String),
}

/// A scored time range inside a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimeInterval {
    /// Start in seconds
    pub start: f64,
    /// End in seconds
    pub end: f64,
    /// Collaborator score, 1-10
    pub score: u8,
    /// Short description of the moment
    #[serde(default)]
    pub label: String,
    /// Why the collaborator picked it
    #[serde(default)]
    pub reason: String,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64, score: u8) -> Self {
        Self {
            start,
            end,
            score: score.clamp(MIN_SCORE, MAX_SCORE),
            label: String::new(),
            reason: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Length in seconds (may be negative for malformed input).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Parse a raw collaborator record.
    ///
    /// `start`/`end` are required (aliases `start_time`/`end_time`) and must be
    /// finite numbers or numeric strings. `score` (alias `humor_score`) is
    /// optional, truncated to an integer and clamped to 1-10. `label` (alias
    /// `description`) and `reason` default to empty.
    pub fn from_record(record: &Value) -> Result<Self, ModelError> {
        let obj = record.as_object().ok_or(ModelError::NotAnObject)?;

        let field = |names: &[&str]| names.iter().find_map(|n| obj.get(*n)).filter(|v| !v.is_null());

        let start = field(&["start", "start_time"])
            .ok_or(ModelError::MissingField("start"))
            .and_then(|v| numeric("start", v))?;
        let end = field(&["end", "end_time"])
            .ok_or(ModelError::MissingField("end"))
            .and_then(|v| numeric("end", v))?;

        let score = match field(&["score", "humor_score"]) {
            Some(v) => {
                let raw = numeric("score", v)?.trunc();
                raw.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u8
            }
            None => DEFAULT_SCORE,
        };

        let text = |names: &[&str]| {
            field(names)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };

        Ok(Self {
            start,
            end,
            score,
            label: text(&["label", "description"]),
            reason: text(&["reason"]),
        })
    }
}

fn numeric(field: &'static str, value: &Value) -> Result<f64, ModelError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).ok_or_else(|| ModelError::NotNumeric {
        field,
        value: value.to_string(),
    })
}

/// Hard duration constraints applied during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DurationLimits {
    /// Shortest acceptable clip in seconds
    pub min_duration: f64,
    /// Longest clip the detector is asked for, in seconds
    pub max_duration: f64,
}

impl Default for DurationLimits {
    fn default() -> Self {
        Self {
            min_duration: 8.0,
            max_duration: 30.0,
        }
    }
}
