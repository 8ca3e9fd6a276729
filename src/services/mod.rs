//! Service layer for the page cache.
//!
//! This module contains the business logic for:
//! - Talking to the Notion content API (`NotionClient`)
//! - Resolving navigation pages (`NavigationResolver`)
//! - Rendering image placeholders (`LqipGenerator`)
//! - Serving pages through the cache (`PageService`)

mod navigation;
mod notion;
mod pages;
mod preview;

#[cfg(test)]
pub(crate) mod testing;

pub use navigation::{NAVIGATION_CONCURRENCY, NavigationResolver};
pub use notion::{ContentApi, NotionClient};
pub use pages::{CacheLookup, MissReason, PAGE_CACHE_TTL, PageService};
pub use preview::{LqipGenerator, PreviewImageSource, image_urls, render_placeholder};
