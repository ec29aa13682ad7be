//! Per-coordinate exclusive locks on the shared dependency cache.
//!
//! Writers hold the lock for one coordinate while they download and store
//! it. The lock is an OS file lock, so it also serializes separate
//! terrabuild processes sharing a cache. It is released on drop.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use terrabuild_util::errors::TerraError;

/// Directory under the cache root holding lock files.
pub const LOCKS_DIR: &str = ".locks";

/// An exclusive lock on one cache coordinate.
#[derive(Debug)]
pub struct CoordinateLock {
    file: File,
    path: PathBuf,
}

impl CoordinateLock {
    /// Block (off the async runtime) until the lock for `coordinate` is held.
    ///
    /// The lock file is `<cache_root>/.locks/<sanitized coordinate>.lock`.
    pub async fn acquire(cache_root: &Path, coordinate: &str) -> miette::Result<Self> {
        let locks_dir = cache_root.join(LOCKS_DIR);
        tokio::fs::create_dir_all(&locks_dir)
            .await
            .map_err(|e| TerraError::Generic {
                message: format!(
                    "Failed to create lock directory {}: {e}",
                    locks_dir.display()
                ),
            })?;

        let path = locks_dir.join(format!("{}.lock", lock_name(coordinate)));
        let lock_path = path.clone();
        let coordinate = coordinate.to_string();

        let file = tokio::task::spawn_blocking(move || -> miette::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)
                .map_err(|e| TerraError::Generic {
                    message: format!("Failed to open lock file {}: {e}", lock_path.display()),
                })?;
            FileExt::lock_exclusive(&file).map_err(|e| TerraError::Generic {
                message: format!("Failed to lock cache entry for {coordinate}: {e}"),
            })?;
            Ok(file)
        })
        .await
        .map_err(|e| TerraError::Generic {
            message: format!("Lock task failed: {e}"),
        })??;

        tracing::trace!("locked {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CoordinateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {e}", self.path.display());
        }
    }
}

/// File-system safe lock name for a coordinate.
fn lock_name(coordinate: &str) -> String {
    coordinate
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
