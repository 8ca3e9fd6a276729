// src/pipeline/page.rs

//! Single page fetch.

use serde::Serialize;

use crate::error::Result;
use crate::models::{RecordMap, block_type};
use crate::services::PageService;

/// Record counts of a fetched page, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub blocks: usize,
    pub pages: usize,
    pub collections: usize,
    pub users: usize,
    pub signed_urls: usize,
    pub preview_images: usize,
    pub failed_previews: usize,
}

impl PageSummary {
    pub fn from_record_map(record_map: &RecordMap) -> Self {
        let pages = record_map
            .block
            .keys()
            .filter_map(|id| record_map.block_value(id))
            .filter(|block| block_type(block) == Some("page"))
            .count();
        let (preview_images, failed_previews) = record_map
            .preview_images
            .as_ref()
            .map(|map| (map.len(), map.values().filter(|p| p.is_none()).count()))
            .unwrap_or_default();

        Self {
            blocks: record_map.block.len(),
            pages,
            collections: record_map.collection.len(),
            users: record_map.notion_user.len(),
            signed_urls: record_map.signed_urls.len(),
            preview_images,
            failed_previews,
        }
    }
}

/// Fetch a page through the cache, or straight from the API when `live`.
pub async fn run_page(service: &PageService, page_id: &str, live: bool) -> Result<RecordMap> {
    let record_map = if live {
        log::info!("Fetching page {} live", page_id);
        service.get_page_from_api(page_id).await?
    } else {
        service.get_page(page_id).await?
    };

    let summary = PageSummary::from_record_map(&record_map);
    log::info!(
        "Page {}: {} blocks ({} pages), {} collections, {} preview images",
        page_id,
        summary.blocks,
        summary.pages,
        summary.collections,
        summary.preview_images
    );
    Ok(record_map)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{PreviewImage, SiteConfig};
    use crate::services::testing::{FakeCacheStore, FakeContentApi, page_map};

    #[test]
    fn test_summary_counts() {
        let mut record_map = page_map("root", &["a", "b"]);
        record_map.preview_images = Some(
            [
                ("x".to_string(), None),
                (
                    "y".to_string(),
                    Some(PreviewImage {
                        original_width: 1,
                        original_height: 1,
                        data_uri_base64: String::new(),
                    }),
                ),
            ]
            .into_iter()
            .collect(),
        );

        let summary = PageSummary::from_record_map(&record_map);

        assert_eq!(summary.blocks, 3);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.preview_images, 2);
        assert_eq!(summary.failed_previews, 1);
    }

    #[tokio::test]
    async fn test_live_fetch_bypasses_cache() {
        let store = Arc::new(FakeCacheStore::new());
        let api = Arc::new(FakeContentApi::new().with_page("root", page_map("root", &[])));
        let service = PageService::new(store.clone(), api.clone(), &SiteConfig::default());

        run_page(&service, "root", true).await.unwrap();
        assert!(store.sets().is_empty());

        run_page(&service, "root", false).await.unwrap();
        assert_eq!(store.sets().len(), 1);
        assert_eq!(api.calls_for("root"), 2);
    }
}
