//! In-memory fakes of the service seams, for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{
    PageOptions, PreviewImage, PreviewImageMap, RecordMap, SearchParams, SearchResults,
};
use crate::services::{ContentApi, PreviewImageSource};
use crate::storage::CacheStore;

/// A record map holding one page block plus plain text blocks.
pub fn page_map(page_id: &str, extra_blocks: &[&str]) -> RecordMap {
    let mut record_map = RecordMap::default();
    record_map.block.insert(
        page_id.to_string(),
        json!({ "role": "reader", "value": { "id": page_id, "type": "page", "content": extra_blocks } }),
    );
    for id in extra_blocks {
        record_map.block.insert(
            id.to_string(),
            json!({ "role": "reader", "value": { "id": id, "type": "text" } }),
        );
    }
    record_map
}

/// Content API fake serving canned pages.
#[derive(Default)]
pub struct FakeContentApi {
    pages: HashMap<String, RecordMap>,
    delays: HashMap<String, Duration>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, PageOptions)>>,
    searches: Mutex<Vec<SearchParams>>,
    search_results: SearchResults,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeContentApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page_id: &str, record_map: RecordMap) -> Self {
        self.pages.insert(page_id.to_string(), record_map);
        self
    }

    pub fn with_delay(mut self, page_id: &str, delay: Duration) -> Self {
        self.delays.insert(page_id.to_string(), delay);
        self
    }

    pub fn with_search_results(mut self, results: SearchResults) -> Self {
        self.search_results = results;
        self
    }

    /// Make fetches of `page_id` fail (or succeed again).
    pub fn set_failing(&self, page_id: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(page_id.to_string());
        } else {
            set.remove(page_id);
        }
    }

    pub fn calls(&self) -> Vec<(String, PageOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, page_id: &str) -> usize {
        self.calls().iter().filter(|(id, _)| id == page_id).count()
    }

    pub fn searches(&self) -> Vec<SearchParams> {
        self.searches.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentApi for FakeContentApi {
    async fn get_page(&self, page_id: &str, options: &PageOptions) -> Result<RecordMap> {
        self.calls
            .lock()
            .unwrap()
            .push((page_id.to_string(), *options));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        match self.delays.get(page_id) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(page_id) {
            return Err(AppError::api("loadPageChunk", 500, "upstream failure"));
        }
        self.pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| AppError::PageNotFound(page_id.to_string()))
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        self.searches.lock().unwrap().push(params.clone());
        Ok(self.search_results.clone())
    }
}

/// Cache store fake that records traffic and can simulate outages.
#[derive(Default)]
pub struct FakeCacheStore {
    entries: Mutex<HashMap<String, String>>,
    sets: Mutex<Vec<(String, String, Duration)>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl FakeCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn sets(&self) -> Vec<(String, String, Duration)> {
        self.sets.lock().unwrap().clone()
    }

    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl CacheStore for FakeCacheStore {
    async fn get(&self, key: &str) -> Result<String> {
        if self.fail_reads {
            return Err(AppError::cache("connection refused"));
        }
        Ok(self.entry(key).unwrap_or_default())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.sets
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string(), ttl));
        if self.fail_writes {
            return Err(AppError::cache("read-only replica"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preview source fake returning one placeholder per page block.
#[derive(Default)]
pub struct FakePreviewSource {
    seen: Mutex<Vec<RecordMap>>,
}

impl FakePreviewSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record maps passed in, in call order.
    pub fn seen(&self) -> Vec<RecordMap> {
        self.seen.lock().unwrap().clone()
    }

    /// The map this fake produces for `record_map`.
    pub fn expected(record_map: &RecordMap) -> PreviewImageMap {
        record_map
            .block
            .keys()
            .map(|id| {
                let image = PreviewImage {
                    original_width: 4,
                    original_height: 3,
                    data_uri_base64: format!("data:image/png;base64,{id}"),
                };
                (format!("example.com/{id}.png"), Some(image))
            })
            .collect()
    }
}

#[async_trait]
impl PreviewImageSource for FakePreviewSource {
    async fn preview_image_map(&self, record_map: &RecordMap) -> Result<PreviewImageMap> {
        self.seen.lock().unwrap().push(record_map.clone());
        Ok(Self::expected(record_map))
    }
}
