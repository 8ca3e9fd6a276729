//! Fetch options for the content API.

use serde::{Deserialize, Serialize};

/// Controls how deep a page fetch goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    /// Blocks requested from the first `loadPageChunk` call
    pub chunk_limit: u32,

    /// Chunk index to load
    pub chunk_number: u32,

    /// Resolve referenced blocks missing from the chunk
    pub fetch_missing_blocks: bool,

    /// Query the collections embedded in the page
    pub fetch_collections: bool,

    /// Sign secure file URLs
    pub sign_file_urls: bool,

    /// Concurrent collection queries
    pub concurrency: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            chunk_limit: 100,
            chunk_number: 0,
            fetch_missing_blocks: true,
            fetch_collections: true,
            sign_file_urls: true,
            concurrency: 3,
        }
    }
}

impl PageOptions {
    /// Shallow fetch used for navigation pages: one chunk, nothing extra.
    pub fn navigation() -> Self {
        Self {
            chunk_limit: 1,
            fetch_missing_blocks: false,
            fetch_collections: false,
            sign_file_urls: false,
            ..Self::default()
        }
    }
}
