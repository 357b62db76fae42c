//! File locking for the cache file.
//!
//! Several credo processes may run against the same cache directory (for
//! example two projects resolving at once). Writers take an exclusive OS-level
//! lock on `{cache_dir}/.locks/{name}.lock` before replacing the cache file;
//! the lock is released when the [`CacheLock`] is dropped.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive file lock held for the lifetime of the value.
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquire the exclusive lock named `name` in `cache_dir`.
    ///
    /// Blocks (on a blocking thread, not the runtime) until any other holder
    /// releases it.
    pub async fn acquire(cache_dir: &Path, name: &str) -> Result<Self> {
        let locks_dir = cache_dir.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.with_context(|| {
            format!("Failed to create locks directory: {}", locks_dir.display())
        })?;

        let lock_path = locks_dir.join(format!("{name}.lock"));
        let lock_path_clone = lock_path.clone();
        let name = name.to_string();

        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&lock_path_clone)
                .with_context(|| {
                    format!("Failed to open lock file: {}", lock_path_clone.display())
                })?;

            file.lock_exclusive().with_context(|| format!("Failed to acquire lock for: {name}"))?;

            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        tracing::trace!(target: "cache", "Acquired lock {}", lock_path.display());

        Ok(Self {
            file,
            path: lock_path,
        })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = self.file.unlock() {
            tracing::warn!(target: "cache", "Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
