//! Pipeline metrics.
//!
//! Emitted through the `metrics` facade; they are no-ops until the binary
//! installs a recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const STAGE_DURATION_SECONDS: &str = "mclip_stage_duration_seconds";
    pub const BATCHES_TOTAL: &str = "mclip_batches_total";
    pub const BATCH_CLIPS: &str = "mclip_batch_clips";
    pub const STAGE_FAILURES_TOTAL: &str = "mclip_stage_failures_total";
}

/// Record the duration of one stage invocation (`download`, `trim`, `stitch`).
pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

/// Record a finished batch.
pub fn record_batch(outcome: &'static str, clip_count: usize) {
    counter!(names::BATCHES_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::BATCH_CLIPS).record(clip_count as f64);
}

/// Record the stage a batch failed in.
pub fn record_stage_failure(stage: &'static str) {
    counter!(names::STAGE_FAILURES_TOTAL, "stage" => stage).increment(1);
}
