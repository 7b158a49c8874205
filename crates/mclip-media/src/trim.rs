//! Clip trimming.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use mclip_models::{RangeError, TrimRange};

use crate::error::MediaError;
use crate::scratch::{ScratchFile, ScratchSpace};
use crate::tool::MediaTool;

/// Suffix for trimmed segments.
pub const TRIMMED_SUFFIX: &str = "_trimmed.mp4";

/// Why a trim did not produce a segment.
#[derive(Debug, Error)]
pub enum TrimFailure {
    /// Rejected before the tool was invoked
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    #[error(transparent)]
    Tool(#[from] MediaError),
}

/// Extracts `[start, end)` of a local clip into a new scratch file.
#[derive(Clone)]
pub struct ClipTrimmer {
    tool: Arc<dyn MediaTool>,
    scratch: ScratchSpace,
}

impl ClipTrimmer {
    pub fn new(tool: Arc<dyn MediaTool>, scratch: ScratchSpace) -> Self {
        Self { tool, scratch }
    }

    /// Trim `input` to `[start, end)` seconds.
    ///
    /// A non-positive window fails with [`TrimFailure::InvalidRange`] without
    /// touching the tool.
    pub async fn trim(&self, input: &Path, start: f64, end: f64) -> Result<ScratchFile, TrimFailure> {
        let range = TrimRange::new(start, end)?;
        let output = self.scratch.allocate(TRIMMED_SUFFIX);

        self.tool.trim(input, output.path(), range).await?;

        info!(
            "Trimmed clip saved: {} ({:.3}s from {:.3}s)",
            output.path().display(),
            range.duration(),
            range.start()
        );
        Ok(output)
    }
}
