//! Publisher seam and output keys.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use mclip_models::BatchId;

use crate::error::{StorageError, StorageResult};

/// Key prefix for stitched output.
pub const STITCHED_PREFIX: &str = "stitched";

/// Moves a finished file to durable storage.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Store the file at `local` under `key` and return its public URL.
    ///
    /// The publisher may move or copy `local`; callers must not rely on it
    /// existing afterwards.
    async fn publish(&self, local: &Path, key: &str) -> StorageResult<String>;

    /// Check that the backing store is reachable.
    async fn check(&self) -> StorageResult<()>;

    /// Short name for logs and readiness output.
    fn name(&self) -> &'static str;

    /// Directory served under `/media` when publishing to local disk.
    fn local_root(&self) -> Option<&Path> {
        None
    }
}

/// Object key for a batch's stitched output: `stitched/<date>/<batch_id>.mp4`.
pub fn output_key(batch_id: &BatchId, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}.mp4",
        STITCHED_PREFIX,
        at.format("%Y-%m-%d"),
        batch_id.as_str()
    )
}

/// Reject keys that could escape the publisher's root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");

    if bad {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

/// Join a base URL and a key, percent-encoding each key segment.
pub fn public_url(base: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), encoded.join("/"))
}
