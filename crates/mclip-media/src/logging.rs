//! Structured batch logging.
//!
//! Keeps `batch_id` and `operation` on every pipeline log line so a batch can
//! be followed through interleaved requests.

use tracing::{error, info, warn, Span};

use mclip_models::{BatchId, ClipStage};

/// Batch logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct BatchLogger {
    batch_id: String,
    operation: String,
}

impl BatchLogger {
    /// Create a new logger for a batch and operation.
    pub fn new(batch_id: &BatchId, operation: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            "Batch started: {}", message
        );
    }

    /// Log a clip moving to a new stage.
    pub fn log_clip_stage(&self, index: usize, stage: ClipStage) {
        if stage.is_failure() {
            warn!(
                batch_id = %self.batch_id,
                operation = %self.operation,
                clip = index,
                stage = %stage,
                "Clip failed"
            );
        } else {
            info!(
                batch_id = %self.batch_id,
                operation = %self.operation,
                clip = index,
                stage = %stage,
                "Clip stage"
            );
        }
    }

    pub fn log_error(&self, message: &str) {
        error!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            "Batch error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            batch_id = %self.batch_id,
            operation = %self.operation,
            "Batch completed: {}", message
        );
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering the whole batch.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "batch",
            batch_id = %self.batch_id,
            operation = %self.operation
        )
    }
}
