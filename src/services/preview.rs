// src/services/preview.rs

//! Low-quality image placeholders (LQIP) for a record map.
//!
//! Every image a page shows (covers, image blocks, URL icons) gets a tiny PNG
//! thumbnail the frontend can blur in while the full image loads. Placeholders
//! are cached per image, so only new images are downloaded.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::stream::{self, StreamExt};
use image::ImageFormat;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    NotionConfig, PreviewConfig, PreviewImage, PreviewImageMap, RecordMap, block_type,
    record_value,
};
use crate::storage::CacheStore;
use crate::utils::http::create_image_client;
use crate::utils::preview_cache_key;
use crate::utils::url::{map_image_url, normalize_url};

/// Computes placeholder images for the images of a record map.
#[async_trait]
pub trait PreviewImageSource: Send + Sync {
    /// Map of normalized image URL to placeholder (`None` when it failed).
    async fn preview_image_map(&self, record_map: &RecordMap) -> Result<PreviewImageMap>;
}

/// Downloads images and renders them into tiny base64 PNG placeholders.
pub struct LqipGenerator {
    client: reqwest::Client,
    cache: Option<Arc<dyn CacheStore>>,
    config: PreviewConfig,
}

impl LqipGenerator {
    /// Create a generator with an existing HTTP client.
    pub fn new(client: reqwest::Client, config: PreviewConfig) -> Self {
        Self {
            client,
            cache: None,
            config,
        }
    }

    /// Create a generator with a credential-free image client.
    pub fn from_config(notion: &NotionConfig, config: PreviewConfig) -> Result<Self> {
        Ok(Self::new(create_image_client(notion)?, config))
    }

    /// Cache rendered placeholders in `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn preview_image(&self, url: &str, key: &str) -> Option<PreviewImage> {
        match self.load_or_render(url, key).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                log::warn!("Preview image failed for {}: {}", url, e);
                None
            }
        }
    }

    async fn load_or_render(&self, url: &str, key: &str) -> Result<PreviewImage> {
        let cache_key = preview_cache_key(key);

        if let Some(cache) = &self.cache {
            match cache.get(&cache_key).await {
                Ok(raw) if !raw.is_empty() => match serde_json::from_str(&raw) {
                    Ok(preview) => return Ok(preview),
                    Err(e) => log::debug!("Ignoring unreadable preview for {}: {}", key, e),
                },
                Ok(_) => {}
                Err(e) => log::debug!("Preview cache unavailable for {}: {}", key, e),
            }
        }

        let bytes = self.download(url).await?;
        let max_size = self.config.max_size;
        let preview = tokio::task::spawn_blocking(move || render_placeholder(&bytes, max_size))
            .await
            .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

        if let Some(cache) = &self.cache {
            let value = serde_json::to_string(&preview)?;
            if let Err(e) = cache.set(&cache_key, &value, self.config.cache_ttl()).await {
                log::warn!("Failed to cache preview for {}: {}", key, e);
            }
        }

        Ok(preview)
    }

    /// Download an image, refusing bodies over `max_download_bytes`.
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let limit = self.config.max_download_bytes;
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        if let Some(len) = response.content_length().filter(|len| *len > limit) {
            return Err(AppError::validation(format!(
                "image is {len} bytes, limit is {limit}"
            )));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (bytes.len() + chunk.len()) as u64 > limit {
                return Err(AppError::validation(format!(
                    "image exceeds {limit} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait]
impl PreviewImageSource for LqipGenerator {
    async fn preview_image_map(&self, record_map: &RecordMap) -> Result<PreviewImageMap> {
        let targets: Vec<(String, String)> = image_urls(record_map)
            .into_iter()
            .filter_map(|url| {
                let key = normalize_url(&url);
                (!key.is_empty()).then_some((url, key))
            })
            .collect();

        if targets.is_empty() {
            return Ok(PreviewImageMap::new());
        }
        log::info!("Computing {} preview images", targets.len());

        let previews = stream::iter(targets)
            .map(|(url, key)| async move {
                let preview = self.preview_image(&url, &key).await;
                (key, preview)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect::<PreviewImageMap>()
            .await;

        let failed = previews.values().filter(|p| p.is_none()).count();
        if failed > 0 {
            log::warn!("{} of {} preview images failed", failed, previews.len());
        }
        Ok(previews)
    }
}

/// Downloadable URLs of every image shown by the record map, deduplicated.
///
/// Covers the page cover, image blocks (preferring a signed URL) and page
/// icons that are URLs rather than emoji.
pub fn image_urls(record_map: &RecordMap) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for (block_id, record) in &record_map.block {
        let Some(block) = record_value(record) else {
            continue;
        };
        let parent_table = block
            .get("parent_table")
            .and_then(Value::as_str)
            .unwrap_or("block");
        let format = block.get("format");

        let mut raw = Vec::new();
        if let Some(cover) = format.and_then(|f| f.get("page_cover")).and_then(Value::as_str) {
            raw.push(cover.to_string());
        }
        if block_type(block) == Some("image") {
            let source = record_map.signed_urls.get(block_id).cloned().or_else(|| {
                format
                    .and_then(|f| f.get("display_source"))
                    .or_else(|| block.pointer("/properties/source/0/0"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            raw.extend(source);
        }
        let icon = format
            .and_then(|f| f.get("page_icon"))
            .and_then(Value::as_str)
            .filter(|icon| icon.starts_with("http") || icon.starts_with('/'));
        raw.extend(icon.map(str::to_string));

        for url in raw
            .iter()
            .filter_map(|r| map_image_url(r, block_id, parent_table))
        {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}

/// Decode an image and render a thumbnail no larger than `max_size` pixels
/// per side as a PNG data URI.
pub fn render_placeholder(bytes: &[u8], max_size: u32) -> Result<PreviewImage> {
    let image = image::load_from_memory(bytes)?;
    let thumbnail = image.thumbnail(max_size, max_size);

    let mut png = Vec::new();
    thumbnail.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(PreviewImage {
        original_width: image.width(),
        original_height: image.height(),
        data_uri_base64: format!("data:image/png;base64,{}", STANDARD.encode(&png)),
    })
}
