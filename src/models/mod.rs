// src/models/mod.rs

//! Domain models for the page cache.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod options;
mod preview;
mod record_map;
mod search;

// Re-export all public types
pub use config::{
    CacheBackend, CacheConfig, Config, NavigationLink, NavigationStyle, NotionConfig,
    PreviewConfig, SiteConfig,
};
pub use options::PageOptions;
pub use preview::{PreviewImage, PreviewImageMap};
pub use record_map::{RecordMap, RecordTable, block_type, record_value};
pub use search::{SearchParams, SearchResults};
