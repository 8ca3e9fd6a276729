// src/pipeline/warm.rs

//! Cache warming pipeline.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::Result;
use crate::models::Config;
use crate::services::{NAVIGATION_CONCURRENCY, PageService};

/// Outcome of a warm run.
#[derive(Debug, Clone, Serialize)]
pub struct WarmStats {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub warmed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Pages a warm run fetches: the root page, then every navigation page.
pub fn warm_targets(config: &Config) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    let root = config.site.root_page_id.trim();
    let candidates = std::iter::once(root)
        .chain(config.site.navigation_links.iter().filter_map(|l| l.page_id()));
    for page_id in candidates {
        if !page_id.is_empty() && !targets.iter().any(|t| t == page_id) {
            targets.push(page_id.to_string());
        }
    }
    targets
}

/// Fetch the root and navigation pages through the cache.
///
/// A page that fails is recorded and the run continues; the run only fails
/// when every page does.
pub async fn run_warm(service: &PageService, config: &Config) -> Result<WarmStats> {
    let start_time = Utc::now();
    let targets = warm_targets(config);
    log::info!("Warming {} pages", targets.len());

    let results: Vec<(String, Result<()>)> = stream::iter(targets)
        .map(|page_id| async move {
            let result = service.get_page(&page_id).await.map(|_| ());
            (page_id, result)
        })
        .buffered(NAVIGATION_CONCURRENCY)
        .collect()
        .await;

    let mut warmed = Vec::new();
    let mut failed = Vec::new();
    let mut last_error = None;
    for (page_id, result) in results {
        match result {
            Ok(()) => warmed.push(page_id),
            Err(e) => {
                log::warn!("Failed to warm page {}: {}", page_id, e);
                failed.push((page_id, e.to_string()));
                last_error = Some(e);
            }
        }
    }

    if warmed.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    log::info!("Warmed {} pages, {} failed", warmed.len(), failed.len());
    Ok(WarmStats {
        start_time,
        end_time: Utc::now(),
        warmed,
        failed,
    })
}
