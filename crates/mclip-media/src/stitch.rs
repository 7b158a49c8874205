//! Segment stitching.

use std::sync::Arc;

use tracing::info;

use crate::error::MediaResult;
use crate::manifest::ConcatManifest;
use crate::scratch::{ScratchFile, ScratchSpace};
use crate::tool::MediaTool;

/// Suffix for stitched output.
pub const STITCHED_SUFFIX: &str = "_stitched.mp4";

/// Joins the segments of a manifest into one scratch file.
///
/// Segments are stream-copied, so they must share codec parameters; the
/// trimmer guarantees this by encoding every segment identically.
#[derive(Clone)]
pub struct Stitcher {
    tool: Arc<dyn MediaTool>,
    scratch: ScratchSpace,
}

impl Stitcher {
    pub fn new(tool: Arc<dyn MediaTool>, scratch: ScratchSpace) -> Self {
        Self { tool, scratch }
    }

    pub async fn stitch(&self, manifest: &ConcatManifest) -> MediaResult<ScratchFile> {
        let output = self.scratch.allocate(STITCHED_SUFFIX);

        self.tool.concat(manifest.path(), output.path()).await?;

        info!(
            "Stitched video saved: {} ({} segments)",
            output.path().display(),
            manifest.len()
        );
        Ok(output)
    }
}
