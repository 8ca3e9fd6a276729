// src/utils/id.rs

//! Notion ID parsing.
//!
//! Page IDs arrive in several shapes: bare 32-char hex, dashed UUIDs, or
//! embedded at the end of a page URL/slug. The content API wants the dashed
//! UUID form.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};

static DASHED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})\b")
        .expect("dashed id pattern is valid")
});

static COMPACT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9a-f]{32})\b").expect("compact id pattern is valid"));

/// Parse any accepted page ID shape into a lowercase dashed UUID.
///
/// # Examples
/// ```
/// use notion_cache::utils::id::parse_page_id;
///
/// assert_eq!(
///     parse_page_id("My-Page-2dd5d8cab46c4268ad80e378d5bb4b18").unwrap(),
///     "2dd5d8ca-b46c-4268-ad80-e378d5bb4b18"
/// );
/// ```
pub fn parse_page_id(input: &str) -> Result<String> {
    let trimmed = input.split(['?', '#']).next().unwrap_or_default();

    if let Some(caps) = DASHED_ID.captures(trimmed) {
        return Ok(caps[1].to_lowercase());
    }
    if let Some(caps) = COMPACT_ID.captures(trimmed) {
        return Ok(id_to_uuid(&caps[1].to_lowercase()));
    }
    Err(AppError::InvalidPageId(input.to_string()))
}

/// Insert dashes into a 32-char compact ID. Anything else is returned as-is.
pub fn id_to_uuid(id: &str) -> String {
    if id.len() != 32 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return id.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    )
}

/// Strip dashes from a UUID.
pub fn uuid_to_id(uuid: &str) -> String {
    uuid.replace('-', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_to_uuid_leaves_non_hex_alone() {
        assert_eq!(
            id_to_uuid("ccf6080d05664ca2ac36e193af06a79b"),
            "ccf6080d-0566-4ca2-ac36-e193af06a79b"
        );
        let wide = "é".repeat(16);
        assert_eq!(wide.len(), 32);
        assert_eq!(id_to_uuid(&wide), wide);
        assert_eq!(
            id_to_uuid("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"),
            "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"
        );
    }

    #[test]
    fn test_parse_compact_id() {
        assert_eq!(
            parse_page_id("ccf6080d05664ca2ac36e193af06a79b").unwrap(),
            "ccf6080d-0566-4ca2-ac36-e193af06a79b"
        );
    }

    #[test]
    fn test_parse_dashed_id_uppercase() {
        assert_eq!(
            parse_page_id("CCF6080D-0566-4CA2-AC36-E193AF06A79B").unwrap(),
            "ccf6080d-0566-4ca2-ac36-e193af06a79b"
        );
    }

    #[test]
    fn test_parse_from_url_ignores_query() {
        assert_eq!(
            parse_page_id(
                "https://www.notion.so/About-ccf6080d05664ca2ac36e193af06a79b?pvs=4"
            )
            .unwrap(),
            "ccf6080d-0566-4ca2-ac36-e193af06a79b"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_page_id("abc123"),
            Err(AppError::InvalidPageId(_))
        ));
    }

    #[test]
    fn test_uuid_round_trip() {
        let id = "424d4cdff3734bed871245efd0e3a4e5";
        assert_eq!(uuid_to_id(&id_to_uuid(id)), id);
    }
}
