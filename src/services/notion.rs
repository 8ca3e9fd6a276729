// src/services/notion.rs

//! Content API client.
//!
//! `NotionClient` talks to Notion's private `api/v3` endpoints:
//!
//! - `loadPageChunk`: the page and its first `chunk_limit` blocks
//! - `syncRecordValues`: blocks referenced by the page but not in the chunk
//! - `queryCollection`: rows of embedded databases
//! - `getSignedFileUrls`: temporary URLs for secure file attachments
//! - `search`: full-text search below an ancestor page

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{
    NotionConfig, PageOptions, RecordMap, RecordTable, SearchParams, SearchResults, block_type,
};
use crate::utils::http::create_async_client;
use crate::utils::id::{parse_page_id, uuid_to_id};

/// Block types whose source may point at a secure Notion file.
const FILE_BLOCK_TYPES: &[&str] = &["pdf", "audio", "image", "video", "file", "page"];

/// Block types that embed a collection.
const COLLECTION_BLOCK_TYPES: &[&str] = &["collection_view", "collection_view_page"];

/// Default number of search results.
const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Operations the page cache needs from the content API.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch a page's record map.
    async fn get_page(&self, page_id: &str, options: &PageOptions) -> Result<RecordMap>;

    /// Run a full-text search.
    async fn search(&self, params: &SearchParams) -> Result<SearchResults>;
}

#[derive(Debug, Deserialize)]
struct RecordMapEnvelope {
    #[serde(default, rename = "recordMap")]
    record_map: Option<RecordMap>,
}

#[derive(Debug, Deserialize)]
struct CollectionData {
    #[serde(default)]
    result: Value,
    #[serde(default, rename = "recordMap")]
    record_map: RecordMap,
}

#[derive(Debug, Deserialize)]
struct SignedUrls {
    #[serde(default, rename = "signedUrls")]
    signed_urls: Vec<Option<String>>,
}

/// HTTP client for the Notion content API.
#[derive(Debug, Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
}

impl NotionClient {
    /// Create a client from configuration.
    pub fn new(config: &NotionConfig) -> Result<Self> {
        let client = create_async_client(config)?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST a JSON body to an API endpoint and decode the JSON response.
    async fn post<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::api(endpoint, status.as_u16(), message));
        }
        Ok(response.json().await?)
    }

    async fn load_page_chunk(&self, page_uuid: &str, options: &PageOptions) -> Result<RecordMap> {
        let body = json!({
            "pageId": page_uuid,
            "limit": options.chunk_limit,
            "chunkNumber": options.chunk_number,
            "cursor": { "stack": [] },
            "verticalColumns": false,
        });
        let envelope: RecordMapEnvelope = self.post("loadPageChunk", &body).await?;
        Ok(envelope.record_map.unwrap_or_default())
    }

    /// Fetch blocks by ID.
    pub async fn get_blocks(&self, block_ids: &[String]) -> Result<RecordTable> {
        let requests: Vec<Value> = block_ids
            .iter()
            .map(|id| json!({ "pointer": { "table": "block", "id": id }, "version": -1 }))
            .collect();
        let envelope: RecordMapEnvelope = self
            .post("syncRecordValues", &json!({ "requests": requests }))
            .await?;
        Ok(envelope.record_map.unwrap_or_default().block)
    }

    async fn query_collection(&self, collection_id: &str, view_id: &str) -> Result<CollectionData> {
        let body = json!({
            "collection": { "id": collection_id },
            "collectionView": { "id": view_id },
            "loader": {
                "type": "reducer",
                "reducers": {
                    "collection_group_results": { "type": "results", "limit": 999 }
                },
                "searchQuery": "",
                "userTimeZone": "UTC",
            },
        });
        self.post("queryCollection", &body).await
    }

    /// Resolve blocks referenced by the page but missing from the chunk.
    async fn fetch_missing_blocks(&self, root_id: &str, record_map: &mut RecordMap) -> Result<()> {
        loop {
            let pending: Vec<String> = record_map
                .content_block_ids(root_id)
                .into_iter()
                .filter(|id| !record_map.block.contains_key(id))
                .collect();
            if pending.is_empty() {
                return Ok(());
            }

            log::debug!("Fetching {} missing blocks for {}", pending.len(), root_id);
            let before = record_map.block.len();
            record_map.block.extend(self.get_blocks(&pending).await?);

            if record_map.block.len() == before {
                log::warn!(
                    "{} blocks of {} could not be resolved",
                    pending.len(),
                    root_id
                );
                return Ok(());
            }
        }
    }

    /// Query every collection view embedded in the page.
    ///
    /// A failed query is logged and skipped.
    async fn fetch_collections(
        &self,
        page_uuid: &str,
        content_ids: &[String],
        concurrency: usize,
        record_map: &mut RecordMap,
    ) {
        let instances = collection_instances(record_map, content_ids);
        if instances.is_empty() {
            return;
        }

        let results: Vec<_> = stream::iter(instances)
            .map(|(collection_id, view_id)| async move {
                let data = self.query_collection(&collection_id, &view_id).await;
                (collection_id, view_id, data)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        for (collection_id, view_id, data) in results {
            match data {
                Ok(data) => {
                    record_map.block.extend(data.record_map.block);
                    record_map.collection.extend(data.record_map.collection);
                    record_map
                        .collection_view
                        .extend(data.record_map.collection_view);
                    record_map.notion_user.extend(data.record_map.notion_user);
                    let reducer_results = data
                        .result
                        .get("reducerResults")
                        .cloned()
                        .unwrap_or(Value::Null);
                    record_map
                        .collection_query
                        .entry(collection_id)
                        .or_default()
                        .insert(view_id, reducer_results);
                }
                Err(e) => {
                    log::warn!(
                        "Collection query failed for page {} (collection {}, view {}): {}",
                        page_uuid,
                        collection_id,
                        view_id,
                        e
                    );
                }
            }
        }
    }

    /// Sign secure file URLs referenced by the page's blocks.
    ///
    /// A signing failure is logged; the record map keeps its unsigned URLs.
    async fn sign_file_urls(&self, content_ids: &[String], record_map: &mut RecordMap) {
        let targets = secure_file_sources(record_map, content_ids);
        if targets.is_empty() {
            return;
        }

        let urls: Vec<Value> = targets
            .iter()
            .map(|(id, url)| {
                json!({ "permissionRecord": { "table": "block", "id": id }, "url": url })
            })
            .collect();

        match self
            .post::<SignedUrls>("getSignedFileUrls", &json!({ "urls": urls }))
            .await
        {
            Ok(signed) => {
                for ((block_id, _), url) in targets.into_iter().zip(signed.signed_urls) {
                    if let Some(url) = url {
                        record_map.signed_urls.insert(block_id, url);
                    }
                }
            }
            Err(e) => log::warn!("Failed to sign {} file URLs: {}", urls.len(), e),
        }
    }
}

#[async_trait]
impl ContentApi for NotionClient {
    async fn get_page(&self, page_id: &str, options: &PageOptions) -> Result<RecordMap> {
        let page_uuid = parse_page_id(page_id)?;
        let mut record_map = self.load_page_chunk(&page_uuid, options).await?;
        if record_map.is_empty() {
            return Err(AppError::PageNotFound(uuid_to_id(&page_uuid)));
        }
        record_map.collection_query.clear();
        record_map.signed_urls.clear();

        if options.fetch_missing_blocks {
            self.fetch_missing_blocks(&page_uuid, &mut record_map).await?;
        }

        let content_ids = record_map.content_block_ids(&page_uuid);

        if options.fetch_collections {
            self.fetch_collections(&page_uuid, &content_ids, options.concurrency, &mut record_map)
                .await;
        }
        if options.sign_file_urls {
            self.sign_file_urls(&content_ids, &mut record_map).await;
        }

        Ok(record_map)
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let ancestor_id = parse_page_id(&params.ancestor_id)?;

        let mut filters = json!({
            "isDeletedOnly": false,
            "excludeTemplates": true,
            "navigableBlockContentOnly": true,
            "requireEditPermissions": false,
            "includePublicPagesWithoutExplicitAccess": true,
            "ancestors": [],
            "createdBy": [],
            "editedBy": [],
            "lastEditedTime": {},
            "createdTime": {},
            "inTeams": [],
        });
        if let (Some(extra), Some(target)) = (&params.filters, filters.as_object_mut()) {
            target.extend(extra.clone());
        }

        let body = json!({
            "type": "BlocksInAncestor",
            "source": "quick_find_public",
            "ancestorId": ancestor_id,
            "sort": { "field": "relevance" },
            "limit": params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            "query": params.query,
            "filters": filters,
        });
        self.post("search", &body).await
    }
}

/// `(collection_id, view_id)` pairs for every collection block in the page.
fn collection_instances(record_map: &RecordMap, content_ids: &[String]) -> Vec<(String, String)> {
    content_ids
        .iter()
        .filter_map(|id| record_map.block_value(id))
        .filter(|block| block_type(block).is_some_and(|t| COLLECTION_BLOCK_TYPES.contains(&t)))
        .flat_map(|block| {
            let Some(collection_id) = block
                .get("collection_id")
                .and_then(Value::as_str)
                .or_else(|| block.pointer("/format/collection_pointer/id").and_then(Value::as_str))
            else {
                return Vec::new();
            };
            block
                .get("view_ids")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(|view_id| (collection_id.to_string(), view_id.to_string()))
                .collect()
        })
        .collect()
}

/// `(block_id, url)` pairs for blocks whose source is a secure Notion file.
fn secure_file_sources(record_map: &RecordMap, content_ids: &[String]) -> Vec<(String, String)> {
    content_ids
        .iter()
        .filter_map(|id| {
            let block = record_map.block_value(id)?;
            let kind = block_type(block)?;
            if !FILE_BLOCK_TYPES.contains(&kind) {
                return None;
            }
            let source = if kind == "page" {
                block.pointer("/format/page_cover")
            } else {
                block.pointer("/properties/source/0/0")
            }
            .and_then(Value::as_str)?;
            let secure = source.contains("secure.notion-static.com")
                || source.contains("prod-files-secure")
                || source.starts_with("attachment:");
            secure.then(|| (id.clone(), source.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    const PAGE: &str = "2dd5d8cab46c4268ad80e378d5bb4b18";
    const PAGE_UUID: &str = "2dd5d8ca-b46c-4268-ad80-e378d5bb4b18";

    fn client(server: &Server) -> NotionClient {
        NotionClient::with_client(reqwest::Client::new(), server.url())
    }

    fn block(id: &str, kind: &str, content: &[&str]) -> Value {
        json!({ "role": "reader", "value": { "id": id, "type": kind, "content": content } })
    }

    fn chunk(blocks: Value) -> String {
        json!({ "recordMap": { "block": blocks }, "cursor": { "stack": [] } }).to_string()
    }

    #[tokio::test]
    async fn test_navigation_fetch_is_shallow() {
        let mut server = Server::new_async().await;
        let chunk_mock = server
            .mock("POST", "/loadPageChunk")
            .match_body(Matcher::PartialJson(json!({ "pageId": PAGE_UUID, "limit": 1 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chunk(json!({ PAGE_UUID: block(PAGE_UUID, "page", &["missing"]) })))
            .create_async()
            .await;
        let sync_mock = server
            .mock("POST", "/syncRecordValues")
            .expect(0)
            .create_async()
            .await;

        let record_map = client(&server)
            .get_page(PAGE, &PageOptions::navigation())
            .await
            .unwrap();

        assert!(record_map.block.contains_key(PAGE_UUID));
        chunk_mock.assert_async().await;
        sync_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetches_missing_blocks() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/loadPageChunk")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chunk(json!({
                PAGE_UUID: block(PAGE_UUID, "page", &["a", "b"]),
                "a": block("a", "text", &[]),
            })))
            .create_async()
            .await;
        let sync_mock = server
            .mock("POST", "/syncRecordValues")
            .match_body(Matcher::PartialJson(json!({
                "requests": [{ "pointer": { "table": "block", "id": "b" }, "version": -1 }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "recordMap": { "block": { "b": block("b", "text", &[]) } } }).to_string())
            .expect(1)
            .create_async()
            .await;

        let options = PageOptions {
            fetch_collections: false,
            sign_file_urls: false,
            ..PageOptions::default()
        };
        let record_map = client(&server).get_page(PAGE, &options).await.unwrap();

        assert!(record_map.block.contains_key("a"));
        assert!(record_map.block.contains_key("b"));
        sync_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_queries_collections() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/loadPageChunk")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chunk(json!({
                PAGE_UUID: block(PAGE_UUID, "page", &["db"]),
                "db": { "value": {
                    "id": "db", "type": "collection_view",
                    "collection_id": "c1", "view_ids": ["v1"]
                } },
            })))
            .create_async()
            .await;
        server
            .mock("POST", "/queryCollection")
            .match_body(Matcher::PartialJson(json!({
                "collection": { "id": "c1" }, "collectionView": { "id": "v1" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "result": { "reducerResults": { "collection_group_results": { "blockIds": ["row1"] } } },
                    "recordMap": { "block": { "row1": block("row1", "page", &[]) } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let options = PageOptions {
            sign_file_urls: false,
            ..PageOptions::default()
        };
        let record_map = client(&server).get_page(PAGE, &options).await.unwrap();

        assert!(record_map.block.contains_key("row1"));
        assert_eq!(
            record_map.collection_query["c1"]["v1"]["collection_group_results"]["blockIds"][0],
            "row1"
        );
    }

    #[tokio::test]
    async fn test_empty_chunk_is_page_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/loadPageChunk")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"recordMap":{}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .get_page(PAGE, &PageOptions::navigation())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PageNotFound(id) if id == PAGE));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/loadPageChunk")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = client(&server)
            .get_page(PAGE, &PageOptions::navigation())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_invalid_page_id_skips_network() {
        let server = Server::new_async().await;
        let err = client(&server)
            .get_page("abc123", &PageOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPageId(_)));
    }

    #[tokio::test]
    async fn test_search_returns_results_unchanged() {
        let mut server = Server::new_async().await;
        let body = json!({
            "results": [{ "id": "hit1", "highlight": { "text": "foo" } }],
            "total": 1,
            "recordMap": { "block": { "hit1": block("hit1", "page", &[]) } }
        });
        server
            .mock("POST", "/search")
            .match_body(Matcher::PartialJson(json!({
                "type": "BlocksInAncestor",
                "ancestorId": PAGE_UUID,
                "query": "foo",
                "limit": 20
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let results = client(&server)
            .search(&SearchParams::new(PAGE, "foo"))
            .await
            .unwrap();

        assert_eq!(results.total, 1);
        assert_eq!(results.results[0]["id"], "hit1");
        assert!(results.record_map.block.contains_key("hit1"));
    }

    #[test]
    fn test_secure_file_sources() {
        let mut record_map = RecordMap::default();
        record_map.block.insert(
            "img".into(),
            json!({ "value": { "id": "img", "type": "image", "properties": {
                "source": [["https://s3-us-west-2.amazonaws.com/secure.notion-static.com/x.png"]]
            } } }),
        );
        record_map.block.insert(
            "ext".into(),
            json!({ "value": { "id": "ext", "type": "image", "properties": {
                "source": [["https://example.com/y.png"]]
            } } }),
        );

        let targets =
            secure_file_sources(&record_map, &["img".to_string(), "ext".to_string()]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, "img");
    }
}
