//! Utility functions and helpers.

pub mod http;
pub mod id;
pub mod url;

use sha2::{Digest, Sha256};

/// Cache key prefix for page record maps.
pub const PAGE_KEY_PREFIX: &str = "page-records:";

/// Cache key prefix for preview images.
pub const PREVIEW_KEY_PREFIX: &str = "preview-image:";

/// Cache key for a page's record map.
///
/// The format is persisted: changing it orphans every cached page.
pub fn page_cache_key(page_id: &str) -> String {
    format!("{PAGE_KEY_PREFIX}{page_id}")
}

/// Cache key for the placeholder of a normalized image URL.
pub fn preview_cache_key(normalized_url: &str) -> String {
    format!("{PREVIEW_KEY_PREFIX}{}", sha256_hex(normalized_url))
}

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_cache_key() {
        assert_eq!(page_cache_key("abc123"), "page-records:abc123");
    }

    #[test]
    fn test_preview_cache_key_is_stable() {
        let key = preview_cache_key("example.com/a.png");
        assert!(key.starts_with("preview-image:"));
        assert_eq!(key.len(), "preview-image:".len() + 64);
        assert_eq!(key, preview_cache_key("example.com/a.png"));
    }
}
