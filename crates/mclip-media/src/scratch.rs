//! Scratch file lifecycle.
//!
//! Every intermediate artifact of a stitch batch lives in a [`ScratchFile`].
//! The handle owns the path: dropping it deletes the file, so cleanup runs on
//! success, on error and when the owning future is dropped mid-flight.
//! Deletion is best effort; failures are logged and never returned.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Directory that hands out uniquely named scratch files.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// A relative `root` is resolved against the current directory, so
    /// every allocated path is absolute.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist.
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Reserve a fresh `<uuid><suffix>` path. Nothing is created on disk.
    pub fn allocate(&self, suffix: &str) -> ScratchFile {
        let path = self.root.join(format!("{}{}", Uuid::new_v4(), suffix));
        debug!("Allocated scratch file {}", path.display());
        ScratchFile::new(path)
    }
}

/// Scoped handle to a scratch file, deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Take ownership of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now instead of at drop.
    pub async fn release(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) => log_removal_failure(&self.path, &e),
        }
    }

    /// Give up ownership; the file is kept and the caller becomes responsible for it.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) => log_removal_failure(&self.path, &e),
        }
    }
}

fn log_removal_failure(path: &Path, e: &std::io::Error) {
    // A file that was never written, or was moved away by its consumer, is not a leak
    if e.kind() != ErrorKind::NotFound {
        warn!("Failed to remove scratch file {}: {}", path.display(), e);
    }
}
