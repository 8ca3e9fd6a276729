// src/lambda/mod.rs

//! AWS Lambda handler for the page cache.
//!
//! The function answers two actions:
//! 1. `page`: return a page's record map, served through the S3-backed cache
//! 2. `search`: run a full-text search below an ancestor page

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use crate::config::{LambdaConfigLoader, apply_env_overrides};
use crate::error::{AppError, Result};
use crate::models::{Config, RecordMap, SearchParams};
use crate::services::PageService;
use crate::storage::S3Store;

/// Environment variable naming the S3 prefix holding `config.toml`.
pub const CONFIG_PREFIX_ENV: &str = "CONFIG_S3_PREFIX";

/// Page service shared across warm invocations.
static SERVICE: OnceCell<PageService> = OnceCell::const_new();

/// Lambda invocation payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CacheRequest {
    /// Fetch a page through the cache
    Page { page_id: String },

    /// Search below an ancestor page
    Search {
        query: String,
        #[serde(default)]
        ancestor_id: Option<String>,
        #[serde(default)]
        limit: Option<u32>,
    },
}

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
pub struct CacheResponse {
    /// Whether the request succeeded
    pub success: bool,

    /// Record map for `page` requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_map: Option<RecordMap>,

    /// Matches for `search` requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<serde_json::Value>>,

    /// Error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<CacheRequest>,
) -> std::result::Result<CacheResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (request, _context) = event.into_parts();
    info!("Handling request: {:?}", request);

    let result = match SERVICE.get_or_try_init(build_service).await {
        Ok(service) => handle(service, request).await,
        Err(e) => Err(e),
    };

    let execution_time_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(mut response) => {
            response.success = true;
            response.execution_time_ms = execution_time_ms;
            info!("Request completed in {}ms", execution_time_ms);
            Ok(response)
        }
        Err(e) => {
            error!("Request failed: {}", e);
            Ok(CacheResponse {
                error: Some(e.to_string()),
                execution_time_ms,
                ..Default::default()
            })
        }
    }
}

/// Dispatch a request to the page service.
pub async fn handle(service: &PageService, request: CacheRequest) -> Result<CacheResponse> {
    match request {
        CacheRequest::Page { page_id } => {
            let record_map = service.get_page(&page_id).await?;
            Ok(CacheResponse {
                record_map: Some(record_map),
                ..Default::default()
            })
        }
        CacheRequest::Search {
            query,
            ancestor_id,
            limit,
        } => {
            let ancestor_id = ancestor_id
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| AppError::validation("search requires an ancestor_id"))?;
            let mut params = SearchParams::new(ancestor_id, query);
            params.limit = limit;
            let results = service.search(&params).await?;
            Ok(CacheResponse {
                results: Some(results.results),
                ..Default::default()
            })
        }
    }
}

async fn build_service() -> Result<PageService> {
    let config = load_lambda_config().await;
    let store = S3Store::from_config(&config.cache).await;
    PageService::from_config(&config, Arc::new(store))
}

/// Load configuration from S3, falling back to defaults plus environment.
async fn load_lambda_config() -> Config {
    let mut config = match std::env::var(CONFIG_PREFIX_ENV) {
        Ok(prefix) => {
            let loader = LambdaConfigLoader::new(S3Store::from_env().await, &prefix);
            loader.load_config().await.unwrap_or_else(|e| {
                warn!("Config load from S3 failed: {}. Using defaults.", e);
                Config::default()
            })
        }
        Err(_) => Config::default(),
    };
    apply_env_overrides(&mut config);
    config
}
