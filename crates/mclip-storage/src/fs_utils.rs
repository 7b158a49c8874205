//! File moves that may cross filesystems.
//!
//! Scratch storage is often a tmpfs while the media directory is on disk, so
//! a plain rename can fail with EXDEV.

use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use crate::error::StorageResult;

/// Move `src` to `dst`, creating `dst`'s parent directories.
///
/// Tries a rename first and falls back to copying into a sibling of `dst`
/// followed by a rename, so `dst` never holds a partial file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> StorageResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_then_remove(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

/// EXDEV on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_then_remove(src: &Path, dst: &Path) -> StorageResult<()> {
    let partial = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &partial).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&partial, dst).await {
        let _ = fs::remove_file(&partial).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        warn!("Failed to remove {} after copy: {}", src.display(), e);
    }

    Ok(())
}
