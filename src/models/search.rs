//! Search request and response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RecordMap;

/// Parameters for a full-text search below an ancestor page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Page whose descendants are searched
    pub ancestor_id: String,

    /// Query text
    pub query: String,

    /// Maximum number of results (API default applies when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Extra filter fields, overriding the defaults key by key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Map<String, Value>>,
}

impl SearchParams {
    pub fn new(ancestor_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            ancestor_id: ancestor_id.into(),
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Search results as returned by the content API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    /// Matching blocks with highlight information
    #[serde(default)]
    pub results: Vec<Value>,

    /// Total number of matches
    #[serde(default)]
    pub total: u64,

    /// Records referenced by the results
    #[serde(default)]
    pub record_map: RecordMap,
}
