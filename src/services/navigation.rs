// src/services/navigation.rs

//! Navigation page resolver.
//!
//! Pages linked from the custom navigation header must have their blocks in
//! every rendered record map so the header knows their titles and slugs. The
//! list is static for the life of the process, so it is fetched once on first
//! use and kept until [`NavigationResolver::reset`].

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{NavigationStyle, PageOptions, RecordMap, SiteConfig};
use crate::services::ContentApi;

/// Maximum navigation page fetches in flight.
pub const NAVIGATION_CONCURRENCY: usize = 4;

/// Fetches and memoizes the record maps of the configured navigation pages.
pub struct NavigationResolver {
    api: Arc<dyn ContentApi>,
    style: NavigationStyle,
    page_ids: Vec<String>,
    pages: Mutex<Option<Arc<Vec<RecordMap>>>>,
}

impl NavigationResolver {
    /// Create a resolver for the site's navigation settings.
    pub fn new(api: Arc<dyn ContentApi>, site: &SiteConfig) -> Self {
        let page_ids = site
            .navigation_links
            .iter()
            .filter_map(|link| link.page_id())
            .map(str::to_string)
            .collect();

        Self {
            api,
            style: site.navigation_style,
            page_ids,
            pages: Mutex::new(None),
        }
    }

    /// Whether the site uses the custom navigation header.
    pub fn uses_custom_style(&self) -> bool {
        self.style != NavigationStyle::Default
    }

    /// Page IDs of the navigation links, in configured order.
    pub fn page_ids(&self) -> &[String] {
        &self.page_ids
    }

    /// Record maps of every navigation page, in configured order.
    ///
    /// The first successful call fetches and caches the list; later calls
    /// return the cached list. A failed fetch is not cached, so the next call
    /// retries. Concurrent first callers wait for a single fetch.
    pub async fn resolve(&self) -> Result<Arc<Vec<RecordMap>>> {
        let mut pages = self.pages.lock().await;
        if let Some(pages) = pages.as_ref() {
            return Ok(Arc::clone(pages));
        }

        let fetched = Arc::new(self.fetch_all().await?);
        *pages = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Drop the cached list; the next [`resolve`](Self::resolve) fetches again.
    pub async fn reset(&self) {
        *self.pages.lock().await = None;
    }

    /// Whether a list is currently cached.
    pub async fn is_resolved(&self) -> bool {
        self.pages.lock().await.is_some()
    }

    async fn fetch_all(&self) -> Result<Vec<RecordMap>> {
        if !self.uses_custom_style() || self.page_ids.is_empty() {
            return Ok(Vec::new());
        }

        log::info!("Fetching {} navigation pages", self.page_ids.len());
        let options = PageOptions::navigation();
        stream::iter(&self.page_ids)
            .map(|page_id| self.api.get_page(page_id, &options))
            .buffered(NAVIGATION_CONCURRENCY)
            .try_collect()
            .await
    }
}
