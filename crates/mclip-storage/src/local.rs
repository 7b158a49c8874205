//! Local-directory publisher.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::move_file;
use crate::publisher::{public_url, validate_key, Publisher};

/// Publishes by moving files under a directory served over HTTP.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    root: PathBuf,
    base_url: String,
}

impl LocalPublisher {
    /// `base_url` is the URL the `root` directory is served at.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, local: &Path, key: &str) -> StorageResult<String> {
        validate_key(key)?;

        let dest = self.root.join(key);
        move_file(local, &dest).await?;

        let url = public_url(&self.base_url, key);
        info!("Published {} to {}", dest.display(), url);
        Ok(url)
    }

    async fn check(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let meta = tokio::fs::metadata(&self.root).await?;
        if meta.permissions().readonly() {
            return Err(StorageError::unavailable(format!(
                "{} is read-only",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }

    fn local_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
