// src/utils/url.rs

//! Image URL handling for preview generation.

use url::Url;

const NOTION_ORIGIN: &str = "https://www.notion.so";

/// Rewrite an image URL found in a record map into one that can be downloaded.
///
/// Notion-hosted assets go through the `notion.so/image` proxy with the owning
/// block attached; pre-signed S3 URLs and external images are returned as is.
/// Returns `None` for `data:` URIs and empty input.
///
/// # Examples
/// ```
/// use notion_cache::utils::url::map_image_url;
///
/// assert_eq!(
///     map_image_url("/images/page-cover/woodcuts_1.jpg", "abc", "block").unwrap(),
///     "https://www.notion.so/image/https%3A%2F%2Fwww.notion.so%2Fimages%2Fpage-cover%2Fwoodcuts_1.jpg?table=block&id=abc&cache=v2"
/// );
/// ```
pub fn map_image_url(raw: &str, block_id: &str, parent_table: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    if let Ok(parsed) = Url::parse(raw) {
        let presigned = parsed.query_pairs().any(|(k, _)| k == "X-Amz-Signature");
        if presigned && parsed.host_str().is_some_and(|h| h.ends_with(".amazonaws.com")) {
            return Some(raw.to_string());
        }
        if !is_notion_hosted(&parsed) && !raw.starts_with(NOTION_ORIGIN) {
            return Some(raw.to_string());
        }
    }

    let absolute = if raw.starts_with("/images") {
        format!("{NOTION_ORIGIN}{raw}")
    } else {
        raw.to_string()
    };

    let proxied = if absolute.starts_with("/image") {
        format!("{NOTION_ORIGIN}{absolute}")
    } else if absolute.starts_with(&format!("{NOTION_ORIGIN}/image/")) {
        absolute
    } else {
        format!("{NOTION_ORIGIN}/image/{}", encode_component(&absolute))
    };

    let table = match parent_table {
        "space" | "collection" | "team" | "" => "block",
        other => other,
    };

    let mut url = Url::parse(&proxied).ok()?;
    url.query_pairs_mut()
        .clear()
        .append_pair("table", table)
        .append_pair("id", block_id)
        .append_pair("cache", "v2");
    Some(url.to_string())
}

/// Normalize a URL into a stable cache key.
///
/// Drops the scheme, a leading `www.`, the query, the fragment and any
/// trailing slash. Returns an empty string for unparsable input.
///
/// # Examples
/// ```
/// use notion_cache::utils::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("https://www.example.com/a/b/?x=1#top"),
///     "example.com/a/b"
/// );
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let path = url.path().trim_end_matches('/');
    format!("{host}{port}{path}")
}

fn is_notion_hosted(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();
    host.ends_with("notion.so")
        || host.ends_with("notion-static.com")
        || (host.ends_with(".amazonaws.com") && url.path().starts_with("/secure.notion-static.com"))
        || host.starts_with("prod-files-secure")
}

/// Percent-encode like `encodeURIComponent`.
fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_image_passes_through() {
        assert_eq!(
            map_image_url("https://images.unsplash.com/photo-1?w=800", "b1", "block").unwrap(),
            "https://images.unsplash.com/photo-1?w=800"
        );
    }

    #[test]
    fn test_notion_asset_goes_through_proxy() {
        let mapped = map_image_url(
            "https://s3-us-west-2.amazonaws.com/secure.notion-static.com/abc/photo.png",
            "b1",
            "space",
        )
        .unwrap();
        assert!(mapped.starts_with(
            "https://www.notion.so/image/https%3A%2F%2Fs3-us-west-2.amazonaws.com%2Fsecure.notion-static.com%2Fabc%2Fphoto.png?"
        ));
        assert!(mapped.ends_with("table=block&id=b1&cache=v2"));
    }

    #[test]
    fn test_presigned_s3_url_kept() {
        let url = "https://prod-files-secure.s3.us-west-2.amazonaws.com/a/b.png?X-Amz-Signature=abc";
        assert_eq!(map_image_url(url, "b1", "block").unwrap(), url);
    }

    #[test]
    fn test_data_uri_skipped() {
        assert!(map_image_url("data:image/png;base64,AA==", "b1", "block").is_none());
        assert!(map_image_url("  ", "b1", "block").is_none());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("http://example.com:8080/x/"), "example.com:8080/x");
        assert_eq!(normalize_url("not a url"), "");
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("a b/c?d"), "a%20b%2Fc%3Fd");
    }
}
