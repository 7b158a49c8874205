//! Stitch pipeline error taxonomy.

use std::fmt;

use thiserror::Error;

use mclip_models::RangeError;

use crate::error::MediaError;

/// Result type for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Stage a batch failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Batch,
    Scratch,
    Download,
    InvalidRange,
    Trim,
    Manifest,
    Stitch,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Batch => "batch",
            PipelineStage::Scratch => "scratch",
            PipelineStage::Download => "download",
            PipelineStage::InvalidRange => "invalid_range",
            PipelineStage::Trim => "trim",
            PipelineStage::Manifest => "manifest",
            PipelineStage::Stitch => "stitch",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a stitch batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Batch contains no clips")]
    EmptyBatch,

    #[error("Scratch storage unavailable: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("clips[{index}]: {source}")]
    Download {
        index: usize,
        #[source]
        source: MediaError,
    },

    #[error("clips[{index}]: {source}")]
    InvalidRange {
        index: usize,
        #[source]
        source: RangeError,
    },

    #[error("clips[{index}]: trimming failed: {source}")]
    Trim {
        index: usize,
        #[source]
        source: MediaError,
    },

    #[error("Failed to write concat manifest: {0}")]
    Manifest(#[source] std::io::Error),

    #[error("Stitching failed: {0}")]
    Stitch(#[source] MediaError),
}

impl PipelineError {
    /// Stage the batch failed in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::EmptyBatch => PipelineStage::Batch,
            PipelineError::InvalidRange { .. } => PipelineStage::InvalidRange,
            PipelineError::Scratch(_) => PipelineStage::Scratch,
            PipelineError::Download { .. } => PipelineStage::Download,
            PipelineError::Trim { .. } => PipelineStage::Trim,
            PipelineError::Manifest(_) => PipelineStage::Manifest,
            PipelineError::Stitch(_) => PipelineStage::Stitch,
        }
    }

    /// Index of the clip that failed, for per-clip stages.
    pub fn clip_index(&self) -> Option<usize> {
        match self {
            PipelineError::Download { index, .. }
            | PipelineError::InvalidRange { index, .. }
            | PipelineError::Trim { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Diagnostic output from the media tool, for trim and stitch failures.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            PipelineError::Trim { source, .. } | PipelineError::Stitch(source) => source.diagnostics(),
            _ => None,
        }
    }

    /// Whether the caller sent an unusable batch, as opposed to a processing failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::EmptyBatch | PipelineError::InvalidRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_index() {
        let err = PipelineError::InvalidRange {
            index: 2,
            source: RangeError::EndNotAfterStart { start: 5.0, end: 3.0 },
        };
        assert_eq!(err.stage(), PipelineStage::InvalidRange);
        assert_eq!(err.clip_index(), Some(2));
        assert!(err.is_client_error());
        assert!(err.to_string().starts_with("clips[2]: Invalid trim values"));
    }

    #[test]
    fn test_diagnostics_from_tool() {
        let err = PipelineError::Stitch(MediaError::ffmpeg_failed(
            "FFmpeg exited with exit status: 1",
            Some("Unsafe file name".to_string()),
            Some(1),
        ));
        assert_eq!(err.stage().as_str(), "stitch");
        assert_eq!(err.diagnostics(), Some("Unsafe file name"));
        assert!(!err.is_client_error());
    }
}
