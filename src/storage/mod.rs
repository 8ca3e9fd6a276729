//! Cache store abstractions backing page lookups.
//!
//! Every backend speaks the same small contract:
//!
//! - `get(key)` returns the stored string, or `""` when the key is absent or
//!   its TTL has passed. Not-found is never an error.
//! - `set(key, value, ttl)` stores a value that expires after `ttl`.
//!
//! Errors are reserved for genuine I/O failures; callers treat them as
//! "cache unavailable".
//!
//! ## Layout (local and S3 backends)
//!
//! ```text
//! {root}/
//! ├── page-records/         # Page record maps (24h TTL)
//! │   └── {page_id}.json
//! └── preview-image/        # LQIP placeholders
//!     └── {sha256}.json
//! ```

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CacheBackend, CacheConfig};

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// Trait for key/value cache backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a value; `""` when absent or expired.
    async fn get(&self, key: &str) -> Result<String>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// A stored value with its expiry, as persisted by the file-based backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the entry was written
    pub stored_at: DateTime<Utc>,
    /// When the entry stops being served
    pub expires_at: DateTime<Utc>,
    /// The cached payload
    pub value: String,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from now.
    pub fn new(value: impl Into<String>, ttl: Duration) -> Result<Self> {
        let stored_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::cache(format!("TTL out of range: {e}")))?;
        Ok(Self {
            stored_at,
            expires_at: stored_at + ttl,
            value: value.into(),
        })
    }

    /// Whether the entry has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// The value if still live, `""` otherwise.
    pub fn live_value(self) -> String {
        if self.is_expired_at(Utc::now()) {
            String::new()
        } else {
            self.value
        }
    }
}

/// Relative object path for a cache key.
///
/// `page-records:abc` becomes `page-records/abc.json`. Bytes outside
/// `[A-Za-z0-9-]` are percent-encoded, so distinct keys never share a path.
/// Keys without a namespace land under `_/`.
pub fn object_path(key: &str) -> String {
    match key.split_once(':') {
        Some((namespace, name)) if !namespace.is_empty() => {
            format!("{}/{}.json", encode_segment(namespace), encode_segment(name))
        }
        _ => format!("_/{}.json", encode_segment(key)),
    }
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Build the configured cache store.
pub async fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        CacheBackend::Local => Ok(Arc::new(LocalStore::new(&config.dir))),
        #[cfg(feature = "s3")]
        CacheBackend::S3 => Ok(Arc::new(S3Store::from_config(config).await)),
        #[cfg(not(feature = "s3"))]
        CacheBackend::S3 => Err(AppError::config(
            "cache.backend = \"s3\" requires the `s3` feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path() {
        assert_eq!(object_path("page-records:abc123"), "page-records/abc123.json");
        assert_eq!(
            object_path("page-records:2dd5d8ca-b46c"),
            "page-records/2dd5d8ca-b46c.json"
        );
        assert_eq!(object_path("../escape"), "_/%2E%2E%2Fescape.json");
    }

    #[test]
    fn test_object_path_keeps_keys_apart() {
        assert_ne!(object_path("page-records:a.b"), object_path("page-records:a_b"));
        assert_ne!(object_path("x"), object_path("_:x"));
        assert_ne!(object_path("x"), object_path(":x"));
        assert_eq!(object_path("page-records:a_b"), "page-records/a%5Fb.json");
    }

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new("v", Duration::from_secs(60)).unwrap();
        assert!(!entry.is_expired_at(entry.stored_at));
        assert!(entry.is_expired_at(entry.stored_at + chrono::Duration::seconds(60)));
        assert_eq!(entry.live_value(), "v");

        let gone = CacheEntry::new("v", Duration::ZERO).unwrap();
        assert_eq!(gone.live_value(), "");
    }

    #[tokio::test]
    async fn test_build_memory_store() {
        let config = CacheConfig {
            backend: CacheBackend::Memory,
            ..CacheConfig::default()
        };
        let store = build_store(&config).await.unwrap();
        assert_eq!(store.get("page-records:x").await.unwrap(), "");
    }
}
