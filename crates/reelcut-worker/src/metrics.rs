//! Pipeline metrics.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Metric names as constants for consistency.
pub mod names {
    // Run lifecycle
    pub const RUNS_STARTED_TOTAL: &str = "reelcut_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "reelcut_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "reelcut_runs_failed_total";

    // Stages
    pub const STAGE_DURATION_SECONDS: &str = "reelcut_stage_duration_seconds";

    // Artifacts
    pub const ARTIFACTS_UPLOADED_TOTAL: &str = "reelcut_artifacts_uploaded_total";
}

/// Serve Prometheus metrics on `addr`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

pub fn record_run_started() {
    counter!(names::RUNS_STARTED_TOTAL).increment(1);
}

pub fn record_run_completed(duration_secs: f64) {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => "total").record(duration_secs);
}

pub fn record_run_failed(kind: &'static str) {
    counter!(names::RUNS_FAILED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_stage(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

pub fn record_upload(store: &'static str) {
    counter!(names::ARTIFACTS_UPLOADED_TOTAL, "store" => store).increment(1);
}
