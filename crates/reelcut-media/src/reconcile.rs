//! Candidate interval reconciliation.
//!
//! The moment detector returns loose records. Each one is parsed, extended
//! to the minimum clip length, clamped into the video, and the survivors are
//! ranked by score.

use serde_json::Value;
use tracing::{debug, info, warn};

use reelcut_models::{DurationLimits, TimeInterval};

use crate::error::MediaError;
use crate::metric_names;

/// Normalizes detector output against hard duration constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalReconciler {
    limits: DurationLimits,
}

impl IntervalReconciler {
    pub fn new(limits: DurationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> DurationLimits {
        self.limits
    }

    /// Parse, normalize and rank a batch of raw records.
    ///
    /// Malformed records are dropped with a warning; an all-malformed batch
    /// yields an empty list. The sort is stable, so equal scores keep their
    /// input order.
    pub fn reconcile(&self, records: &[Value], duration: f64) -> Vec<TimeInterval> {
        let mut intervals: Vec<TimeInterval> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match TimeInterval::from_record(record) {
                Ok(interval) => Some(self.normalize(interval, duration)),
                Err(e) => {
                    let err = MediaError::UnparseableCandidate {
                        index,
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Discarding candidate interval");
                    metrics::counter!(metric_names::CANDIDATES_DISCARDED_TOTAL).increment(1);
                    None
                }
            })
            .collect();

        intervals.sort_by(|a, b| b.score.cmp(&a.score));

        info!(
            received = records.len(),
            kept = intervals.len(),
            duration = duration,
            "Reconciled candidate intervals"
        );
        intervals
    }

    /// Apply the length and bounds rules to one interval.
    ///
    /// A negative start is moved to 0 before the minimum length is applied.
    /// A zero `duration` means unknown and skips the bounds step, so `end`
    /// can land past the real source; clip extraction re-clamps it.
    pub fn normalize(&self, mut interval: TimeInterval, duration: f64) -> TimeInterval {
        let min = self.limits.min_duration;

        interval.start = interval.start.max(0.0);
        if interval.end - interval.start < min {
            interval.end = interval.start + min;
        }

        if duration > 0.0 {
            if interval.start >= duration {
                interval.start = (duration - min).max(0.0);
            }
            if interval.end > duration {
                interval.end = duration;
            }
        }

        if interval.start >= interval.end {
            interval.end = interval.start + min;
        }

        if interval.duration() > self.limits.max_duration {
            debug!(
                start = interval.start,
                end = interval.end,
                max = self.limits.max_duration,
                "Interval longer than requested maximum, keeping it whole"
            );
        }

        interval
    }
}
