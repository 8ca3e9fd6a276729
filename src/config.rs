// src/config.rs

//! Configuration loading utilities.
//!
//! Configuration comes from a TOML file (local path, or S3 inside Lambda)
//! with a handful of environment variables layered on top so secrets never
//! have to live in the file.

use std::path::Path;

#[cfg(feature = "s3")]
use crate::error::AppError;
use crate::error::Result;
use crate::models::Config;
#[cfg(feature = "s3")]
use crate::storage::S3Store;

/// Environment variables that override file configuration.
pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_NOTION_ACTIVE_USER: &str = "NOTION_ACTIVE_USER";
pub const ENV_CACHE_BACKEND: &str = "CACHE_BACKEND";
pub const ENV_CACHE_DIR: &str = "CACHE_DIR";
pub const ENV_S3_BUCKET: &str = "S3_BUCKET";
pub const ENV_S3_PREFIX: &str = "S3_PREFIX";

/// Config loader for Lambda environment.
#[cfg(feature = "s3")]
pub struct LambdaConfigLoader {
    storage: S3Store,
    prefix: String,
}

#[cfg(feature = "s3")]
impl LambdaConfigLoader {
    pub fn new(storage: S3Store, config_prefix: &str) -> Self {
        Self {
            storage,
            prefix: config_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Load `{prefix}/config.toml` from S3.
    pub async fn load_config(&self) -> Result<Config> {
        let key = format!("{}/config.toml", self.prefix);
        log::info!("Loading config file from S3: {}", key);
        let bytes = self
            .storage
            .read_bytes_optional(&key)
            .await?
            .ok_or_else(|| AppError::config(format!("Config file not found in S3: {key}")))?;

        let content = String::from_utf8(bytes).map_err(|e| {
            AppError::config(format!("Config file {key} is not valid UTF-8: {e}"))
        })?;
        Config::from_toml(&content)
    }
}

/// Load configuration from a TOML file and apply environment overrides.
///
/// Falls back to defaults if the file cannot be loaded.
pub fn load_config(path: impl AsRef<Path>) -> Config {
    let mut config = Config::load_or_default(path);
    apply_env_overrides(&mut config);
    config
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

/// Apply overrides from `lookup`; blank values are ignored.
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get(ENV_NOTION_TOKEN) {
        config.notion.auth_token = Some(token);
    }
    if let Some(user) = get(ENV_NOTION_ACTIVE_USER) {
        config.notion.active_user = Some(user);
    }
    if let Some(backend) = get(ENV_CACHE_BACKEND) {
        match backend.parse() {
            Ok(backend) => config.cache.backend = backend,
            Err(e) => log::warn!("Ignoring {}: {}", ENV_CACHE_BACKEND, e),
        }
    }
    if let Some(dir) = get(ENV_CACHE_DIR) {
        config.cache.dir = dir;
    }
    if let Some(bucket) = get(ENV_S3_BUCKET) {
        config.cache.bucket = bucket;
    }
    if let Some(prefix) = get(ENV_S3_PREFIX) {
        config.cache.prefix = prefix;
    }
}

/// Load and validate configuration in one step.
pub fn load_validated(path: impl AsRef<Path>) -> Result<Config> {
    let config = load_config(path);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::CacheBackend;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            env(&[
                ("NOTION_TOKEN", "secret"),
                ("CACHE_BACKEND", "s3"),
                ("S3_BUCKET", "my-bucket"),
                ("S3_PREFIX", "site/cache"),
            ]),
        );

        assert_eq!(config.notion.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.cache.backend, CacheBackend::S3);
        assert_eq!(config.cache.bucket, "my-bucket");
        assert_eq!(config.cache.prefix, "site/cache");
    }

    #[test]
    fn test_blank_and_invalid_overrides_ignored() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            env(&[("NOTION_TOKEN", "  "), ("CACHE_BACKEND", "redis")]),
        );

        assert!(config.notion.auth_token.is_none());
        assert_eq!(config.cache.backend, CacheBackend::Local);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert!(config.site.root_page_id.is_empty());
        assert_eq!(config.cache.backend, CacheBackend::Local);
    }

    #[test]
    fn test_load_validated_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[site]\nroot_page_id = \"7875426197cf461698809def95960ebf\"\n",
        )
        .unwrap();

        let config = load_validated(&path).unwrap();
        assert_eq!(
            config.site.root_page_id,
            "7875426197cf461698809def95960ebf"
        );
    }
}
