//! Local filesystem cache store.
//!
//! Each key is one JSON file holding a [`CacheEntry`] envelope. Suitable for
//! development and single-host deployments; serverless deployments should
//! use `S3Store`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── page-records/
//! │   └── {page_id}.json
//! └── preview-image/
//!     └── {sha256}.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{CacheEntry, CacheStore, object_path};

/// Sequence for temp file names, unique within the process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Local filesystem cache backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a cache key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(object_path(key))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    ///
    /// Each write gets its own temp file, so concurrent writers of one key
    /// never share a partial file; the last rename wins.
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl CacheStore for LocalStore {
    async fn get(&self, key: &str) -> Result<String> {
        let path = self.path(key);
        let Some(bytes) = self.read_bytes(&path).await? else {
            return Ok(String::new());
        };

        let entry: CacheEntry = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::cache(format!("Corrupt entry at {}: {e}", path.display())))?;

        let value = entry.live_value();
        if value.is_empty() {
            log::debug!("Expired cache entry {}", path.display());
            if let Err(e) = tokio::fs::remove_file(&path).await {
                log::debug!("Could not remove expired entry {}: {}", path.display(), e);
            }
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        let bytes = serde_json::to_vec(&entry)?;
        self.write_bytes(&self.path(key), &bytes).await
    }
}
