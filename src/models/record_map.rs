// src/models/record_map.rs

//! Record map: the aggregate returned by the content API for a page.
//!
//! Every table maps a record ID to the raw record as Notion returns it
//! (`{"role": ..., "value": {...}}`). Records stay opaque JSON; only the
//! handful of fields the cache needs (block type, children, formats) are read.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::preview::PreviewImageMap;

/// A table of records keyed by ID.
pub type RecordTable = BTreeMap<String, Value>;

/// Block types that start a new page in the content tree.
const PAGE_BLOCK_TYPES: &[&str] = &["page", "collection_view_page"];

/// A fetched page's content tree and everything it references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub block: RecordTable,

    #[serde(default)]
    pub collection: RecordTable,

    #[serde(default)]
    pub collection_view: RecordTable,

    #[serde(default)]
    pub notion_user: RecordTable,

    /// Collection ID → collection view ID → reducer results
    #[serde(default)]
    pub collection_query: BTreeMap<String, BTreeMap<String, Value>>,

    /// Block ID → signed file URL
    #[serde(default)]
    pub signed_urls: BTreeMap<String, String>,

    /// Normalized image URL → placeholder, present only when computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_images: Option<PreviewImageMap>,
}

impl RecordMap {
    /// Merge `other` into `self`.
    ///
    /// Every table is unioned; on key collision the entry from `other` wins.
    /// `collection_query` is merged per collection, not per view.
    pub fn merge(mut self, other: RecordMap) -> RecordMap {
        self.block.extend(other.block);
        self.collection.extend(other.collection);
        self.collection_view.extend(other.collection_view);
        self.notion_user.extend(other.notion_user);
        self.collection_query.extend(other.collection_query);
        self.signed_urls.extend(other.signed_urls);
        self.preview_images = match (self.preview_images, other.preview_images) {
            (Some(mut mine), Some(theirs)) => {
                mine.extend(theirs);
                Some(mine)
            }
            (mine, theirs) => mine.or(theirs),
        };
        self
    }

    /// Whether the map holds no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    /// The inner `value` of a block record.
    pub fn block_value(&self, block_id: &str) -> Option<&Value> {
        self.block.get(block_id).and_then(record_value)
    }

    /// The inner `value` of a collection record.
    pub fn collection_value(&self, collection_id: &str) -> Option<&Value> {
        self.collection.get(collection_id).and_then(record_value)
    }

    /// The inner `value` of a collection view record.
    pub fn collection_view_value(&self, view_id: &str) -> Option<&Value> {
        self.collection_view.get(view_id).and_then(record_value)
    }

    /// IDs of every block reachable from `root_id` without crossing into
    /// sub-pages, in depth-first order.
    ///
    /// Sub-page blocks themselves are included but not expanded. Referenced
    /// blocks missing from the map are included too, so callers can fetch them.
    pub fn content_block_ids(&self, root_id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        self.collect_content(root_id, root_id, &mut seen, &mut ordered);
        ordered
    }

    fn collect_content(
        &self,
        root_id: &str,
        block_id: &str,
        seen: &mut HashSet<String>,
        ordered: &mut Vec<String>,
    ) {
        if !seen.insert(block_id.to_string()) {
            return;
        }
        ordered.push(block_id.to_string());

        let Some(block) = self.block_value(block_id) else {
            return;
        };
        if block_id != root_id && is_page_block(block) {
            return;
        }

        for child in child_ids(block) {
            self.collect_content(root_id, child, seen, ordered);
        }
    }
}

/// Unwrap a raw record into its `value`.
///
/// Newer API responses nest the record one level deeper
/// (`{"value": {"value": {...}, "role": ...}}`); both shapes are accepted.
pub fn record_value(record: &Value) -> Option<&Value> {
    let value = record.get("value")?;
    match value.get("value") {
        Some(inner) if inner.is_object() && value.get("id").is_none() => Some(inner),
        _ => Some(value),
    }
}

/// The `type` of a block value.
pub fn block_type(block: &Value) -> Option<&str> {
    block.get("type").and_then(Value::as_str)
}

fn is_page_block(block: &Value) -> bool {
    block_type(block).is_some_and(|t| PAGE_BLOCK_TYPES.contains(&t))
}

fn child_ids(block: &Value) -> impl Iterator<Item = &str> {
    block
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}
