// src/services/pages.rs

//! Read-through page cache.
//!
//! `PageService` ties the pieces together: a cache lookup under
//! `page-records:<pageId>`, and on a miss a live fetch (content API, then
//! navigation merge, then preview images) that is written back for a day.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Config, PageOptions, RecordMap, SearchParams, SearchResults, SiteConfig};
use crate::services::{
    ContentApi, LqipGenerator, NavigationResolver, NotionClient, PreviewImageSource,
};
use crate::storage::CacheStore;
use crate::utils::page_cache_key;

/// Lifetime of a cached page record map: 86,400,000 ms.
pub const PAGE_CACHE_TTL: Duration = Duration::from_millis(86_400_000);

/// Outcome of reading a page from the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// A usable record map was stored
    Hit(RecordMap),
    /// Nothing usable was stored
    Miss(MissReason),
}

/// Why a cache lookup produced no record map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No entry, or the entry expired
    Empty,
    /// The entry holds JSON `null`
    Null,
    /// The entry is not a record map
    Malformed(String),
    /// The store could not be read
    Unavailable(String),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::Empty => write!(f, "no entry"),
            MissReason::Null => write!(f, "entry is null"),
            MissReason::Malformed(e) => write!(f, "malformed entry: {e}"),
            MissReason::Unavailable(e) => write!(f, "cache unavailable: {e}"),
        }
    }
}

/// Page retrieval with a read-through cache.
pub struct PageService {
    store: Arc<dyn CacheStore>,
    api: Arc<dyn ContentApi>,
    navigation: NavigationResolver,
    previews: Option<Arc<dyn PreviewImageSource>>,
}

impl PageService {
    /// Create a service without preview images.
    pub fn new(store: Arc<dyn CacheStore>, api: Arc<dyn ContentApi>, site: &SiteConfig) -> Self {
        let navigation = NavigationResolver::new(Arc::clone(&api), site);
        Self {
            store,
            api,
            navigation,
            previews: None,
        }
    }

    /// Attach preview images to every live fetch.
    pub fn with_previews(mut self, previews: Arc<dyn PreviewImageSource>) -> Self {
        self.previews = Some(previews);
        self
    }

    /// Wire up the Notion client and preview generator from configuration.
    ///
    /// Preview placeholders share `store` with the page cache.
    pub fn from_config(config: &Config, store: Arc<dyn CacheStore>) -> Result<Self> {
        let api = Arc::new(NotionClient::new(&config.notion)?);
        let mut service = Self::new(Arc::clone(&store), api, &config.site);

        if config.preview.enabled {
            let generator = LqipGenerator::from_config(&config.notion, config.preview.clone())?
                .with_cache(store);
            service = service.with_previews(Arc::new(generator));
        }
        Ok(service)
    }

    /// The navigation resolver used for live fetches.
    pub fn navigation(&self) -> &NavigationResolver {
        &self.navigation
    }

    /// Read a page from the cache without falling back.
    pub async fn lookup(&self, page_id: &str) -> CacheLookup {
        let raw = match self.store.get(&page_cache_key(page_id)).await {
            Ok(raw) => raw,
            Err(e) => return CacheLookup::Miss(MissReason::Unavailable(e.to_string())),
        };
        if raw.is_empty() {
            return CacheLookup::Miss(MissReason::Empty);
        }

        match serde_json::from_str::<Option<RecordMap>>(&raw) {
            Ok(Some(record_map)) => CacheLookup::Hit(record_map),
            Ok(None) => CacheLookup::Miss(MissReason::Null),
            Err(e) => CacheLookup::Miss(MissReason::Malformed(e.to_string())),
        }
    }

    /// Get a page, serving from the cache when possible.
    ///
    /// Cache failures never surface: they fall back to a live fetch, and a
    /// failed write-back is only logged. Content API failures propagate.
    pub async fn get_page(&self, page_id: &str) -> Result<RecordMap> {
        match self.lookup(page_id).await {
            CacheLookup::Hit(record_map) => {
                log::info!("Cache hit for page {}", page_id);
                return Ok(record_map);
            }
            CacheLookup::Miss(reason) => {
                log::warn!("Cache miss for page {} ({}), fetching live", page_id, reason);
            }
        }

        let record_map = self.get_page_from_api(page_id).await?;
        self.store_page(page_id, &record_map).await;
        Ok(record_map)
    }

    /// Fetch a page live, merging navigation pages and preview images.
    pub async fn get_page_from_api(&self, page_id: &str) -> Result<RecordMap> {
        let mut record_map = self.api.get_page(page_id, &PageOptions::default()).await?;

        if self.navigation.uses_custom_style() {
            let navigation_pages = self.navigation.resolve().await?;
            record_map = navigation_pages
                .iter()
                .cloned()
                .fold(record_map, RecordMap::merge);
        }

        if let Some(previews) = &self.previews {
            let preview_images = previews.preview_image_map(&record_map).await?;
            record_map.preview_images = Some(preview_images);
        }

        Ok(record_map)
    }

    /// Full-text search, passed straight through to the content API.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        self.api.search(params).await
    }

    async fn store_page(&self, page_id: &str, record_map: &RecordMap) {
        let key = page_cache_key(page_id);
        let value = match serde_json::to_string(record_map) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not serialize page {} for caching: {}", page_id, e);
                return;
            }
        };

        match self.store.set(&key, &value, PAGE_CACHE_TTL).await {
            Ok(()) => log::debug!("Cached page {} ({} bytes)", page_id, value.len()),
            Err(e) => log::warn!("Failed to cache page {}: {}", page_id, e),
        }
    }
}
