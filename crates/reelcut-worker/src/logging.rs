//! Structured run logging.
//!
//! Every lifecycle event carries the run ID and the current stage so a
//! single run can be followed through interleaved concurrent output.

use tracing::{error, info, warn, Span};

use reelcut_models::RunId;

/// Logger bound to one pipeline run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    stage: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, stage: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Same run, different stage.
    pub fn for_stage(&self, stage: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = %self.stage,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Span covering the whole run; stage loggers log inside it.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("run", run_id = %self.run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_logger_creation() {
        let run_id = RunId::from_string("abc123def456");
        let logger = RunLogger::new(&run_id, "probe");

        assert_eq!(logger.run_id(), "abc123def456");
        assert_eq!(logger.stage(), "probe");
    }

    #[test]
    fn test_for_stage_keeps_run_id() {
        let logger = RunLogger::new(&RunId::from_string("r1"), "probe").for_stage("compose");
        assert_eq!(logger.run_id(), "r1");
        assert_eq!(logger.stage(), "compose");
    }
}
