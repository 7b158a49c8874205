//! Concat manifest planning.
//!
//! The manifest is an FFmpeg concat-demuxer script: one `file '<path>'`
//! directive per segment, in playback order.

use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::scratch::{ScratchFile, ScratchSpace};

/// Suffix for manifest files.
pub const MANIFEST_SUFFIX: &str = "_files.txt";

/// A written manifest and the segment paths it lists.
#[derive(Debug)]
pub struct ConcatManifest {
    file: ScratchFile,
    entries: Vec<PathBuf>,
}

impl ConcatManifest {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete the manifest file.
    pub async fn release(self) {
        self.file.release().await;
    }
}

/// Writes concat manifests into scratch storage.
#[derive(Debug, Clone)]
pub struct ConcatPlanner {
    scratch: ScratchSpace,
}

impl ConcatPlanner {
    pub fn new(scratch: ScratchSpace) -> Self {
        Self { scratch }
    }

    /// Write a manifest for `segments`, preserving their order.
    ///
    /// Segment existence is not checked; a missing file surfaces when the
    /// manifest is consumed.
    pub async fn write<P: AsRef<Path>>(&self, segments: &[P]) -> std::io::Result<ConcatManifest> {
        let content = render_manifest(segments)?;
        let file = self.scratch.allocate(MANIFEST_SUFFIX);

        tokio::fs::write(file.path(), content).await?;
        debug!(
            "Wrote concat manifest {} with {} entries",
            file.path().display(),
            segments.len()
        );

        Ok(ConcatManifest {
            file,
            entries: segments.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        })
    }
}

/// Render manifest text for `segments`.
pub fn render_manifest<P: AsRef<Path>>(segments: &[P]) -> std::io::Result<String> {
    let mut content = String::new();
    for segment in segments {
        content.push_str("file ");
        content.push_str(&quote_path(segment.as_ref())?);
        content.push('\n');
    }
    Ok(content)
}

/// Quote a path for the concat demuxer.
///
/// Inside single quotes nothing is special except `'`, which is written as
/// `'\''`. Line breaks cannot be represented and are rejected.
fn quote_path(path: &Path) -> std::io::Result<String> {
    let raw = path.to_str().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("segment path is not valid UTF-8: {}", path.display()),
        )
    })?;

    if raw.contains(['\n', '\r']) {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("segment path contains a line break: {:?}", raw),
        ));
    }

    Ok(format!("'{}'", raw.replace('\'', r"'\''")))
}
