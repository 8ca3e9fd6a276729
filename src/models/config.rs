//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::id::parse_page_id;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site-level settings (root page, navigation)
    #[serde(default)]
    pub site: SiteConfig,

    /// Content API client settings
    #[serde(default)]
    pub notion: NotionConfig,

    /// Cache store settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Preview image (LQIP) settings
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.site.root_page_id.trim().is_empty() {
            return Err(AppError::validation("site.root_page_id is empty"));
        }
        parse_page_id(&self.site.root_page_id)?;
        for link in &self.site.navigation_links {
            if let Some(page_id) = link.page_id() {
                parse_page_id(page_id).map_err(|_| {
                    AppError::validation(format!(
                        "navigation link '{}' has an invalid page_id: {}",
                        link.title, page_id
                    ))
                })?;
            }
        }
        if self.notion.user_agent.trim().is_empty() {
            return Err(AppError::validation("notion.user_agent is empty"));
        }
        if self.notion.timeout_secs == 0 {
            return Err(AppError::validation("notion.timeout_secs must be > 0"));
        }
        if self.preview.max_size == 0 {
            return Err(AppError::validation("preview.max_size must be > 0"));
        }
        if self.preview.concurrency == 0 {
            return Err(AppError::validation("preview.concurrency must be > 0"));
        }
        Ok(())
    }

    /// Whether the custom navigation header is in use.
    pub fn uses_custom_navigation(&self) -> bool {
        self.site.navigation_style != NavigationStyle::Default
    }
}

/// Site-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// The site's root Notion page
    #[serde(default)]
    pub root_page_id: String,

    /// Navigation header style
    #[serde(default)]
    pub navigation_style: NavigationStyle,

    /// Links shown in the custom navigation header
    #[serde(default)]
    pub navigation_links: Vec<NavigationLink>,
}

/// Navigation header style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationStyle {
    /// Notion's own breadcrumb header
    #[default]
    Default,
    /// Statically configured link list
    Custom,
}

/// A link in the custom navigation header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationLink {
    /// Display title
    pub title: String,

    /// Notion page the link points to
    #[serde(default)]
    pub page_id: Option<String>,

    /// External URL (used instead of a page)
    #[serde(default)]
    pub url: Option<String>,
}

impl NavigationLink {
    /// The linked page ID, if set and non-blank.
    pub fn page_id(&self) -> Option<&str> {
        self.page_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Content API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Base URL of the private Notion API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// `token_v2` cookie for private workspaces
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Value for the `x-notion-active-user-header` header
    #[serde(default)]
    pub active_user: Option<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            auth_token: None,
            active_user: None,
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Which cache store backs page lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map, lost on exit
    Memory,
    /// JSON files under `cache.dir`
    #[default]
    Local,
    /// Objects in `cache.bucket` (requires the `s3` feature)
    S3,
}

impl std::str::FromStr for CacheBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            other => Err(AppError::config(format!("Unknown cache backend: {other}"))),
        }
    }
}

/// Cache store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: CacheBackend,

    /// Root directory for the local backend
    #[serde(default = "defaults::cache_dir")]
    pub dir: String,

    /// Bucket for the S3 backend
    #[serde(default = "defaults::bucket")]
    pub bucket: String,

    /// Key prefix for the S3 backend
    #[serde(default = "defaults::prefix")]
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: defaults::cache_dir(),
            bucket: defaults::bucket(),
            prefix: defaults::prefix(),
        }
    }
}

/// Preview image (LQIP) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Compute placeholder images for fetched pages
    #[serde(default = "defaults::preview_enabled")]
    pub enabled: bool,

    /// Longest side of the generated placeholder in pixels
    #[serde(default = "defaults::preview_max_size")]
    pub max_size: u32,

    /// Maximum concurrent image downloads
    #[serde(default = "defaults::preview_concurrency")]
    pub concurrency: usize,

    /// Lifetime of cached placeholders in seconds
    #[serde(default = "defaults::preview_ttl")]
    pub cache_ttl_secs: u64,

    /// Largest source image downloaded for a placeholder, in bytes
    #[serde(default = "defaults::preview_max_download_bytes")]
    pub max_download_bytes: u64,
}

impl PreviewConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::preview_enabled(),
            max_size: defaults::preview_max_size(),
            concurrency: defaults::preview_concurrency(),
            cache_ttl_secs: defaults::preview_ttl(),
            max_download_bytes: defaults::preview_max_download_bytes(),
        }
    }
}

mod defaults {
    // Notion defaults
    pub fn base_url() -> String {
        "https://www.notion.so/api/v3".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; notion-cache/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Cache defaults
    pub fn cache_dir() -> String {
        "storage/cache".into()
    }
    pub fn bucket() -> String {
        "notion-cache".into()
    }
    pub fn prefix() -> String {
        "notion-cache".into()
    }

    // Preview defaults
    pub fn preview_enabled() -> bool {
        true
    }
    pub fn preview_max_size() -> u32 {
        16
    }
    pub fn preview_concurrency() -> usize {
        8
    }
    pub fn preview_ttl() -> u64 {
        30 * 24 * 60 * 60
    }
    pub fn preview_max_download_bytes() -> u64 {
        20 * 1024 * 1024
    }
}
