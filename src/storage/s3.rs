//! AWS S3 cache store.
//!
//! Entries are stored as `{bucket}/{prefix}/{namespace}/{name}.json`, each
//! holding a [`CacheEntry`] envelope. Expiry is checked on read; stale objects
//! are left for a bucket lifecycle rule to collect.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::CacheConfig;
use crate::storage::{CacheEntry, CacheStore, object_path};

/// S3-based cache store.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Store {
    /// Create a new S3 store instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Create an S3 store from the cache configuration and ambient AWS credentials.
    pub async fn from_config(config: &CacheConfig) -> Self {
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&aws), &config.bucket, &config.prefix)
    }

    /// Create an S3 store from environment configuration.
    pub async fn from_env() -> Self {
        let defaults = CacheConfig::default();
        let bucket = std::env::var("S3_BUCKET").unwrap_or(defaults.bucket);
        let prefix = std::env::var("S3_PREFIX").unwrap_or(defaults.prefix);
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&aws), bucket, prefix)
    }

    /// Full object key for a cache key.
    fn object_key(&self, key: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            object_path(key)
        } else {
            format!("{}/{}", prefix, object_path(key))
        }
    }

    /// Read an object's bytes, returning None if the key doesn't exist.
    pub async fn read_bytes_optional(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(AppError::s3)?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No object at s3://{}/{}", self.bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::s3(service_err))
                }
            }
        }
    }

    /// Write bytes to an object.
    async fn write_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::s3(e.into_service_error()))?;

        log::debug!("Wrote s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

#[async_trait]
impl CacheStore for S3Store {
    async fn get(&self, key: &str) -> Result<String> {
        let object_key = self.object_key(key);
        let Some(bytes) = self.read_bytes_optional(&object_key).await? else {
            return Ok(String::new());
        };
        let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::cache(format!(
                "Corrupt entry at s3://{}/{}: {e}",
                self.bucket, object_key
            ))
        })?;
        Ok(entry.live_value())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        let bytes = serde_json::to_vec(&entry)?;
        self.write_bytes(&self.object_key(key), bytes).await
    }
}
