//! Preview image (LQIP) data structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalized image URL → placeholder, `None` when generation failed.
pub type PreviewImageMap = BTreeMap<String, Option<PreviewImage>>;

/// A low-quality placeholder for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewImage {
    /// Width of the source image in pixels
    pub original_width: u32,

    /// Height of the source image in pixels
    pub original_height: u32,

    /// Tiny thumbnail as a `data:` URI
    #[serde(rename = "dataURIBase64")]
    pub data_uri_base64: String,
}
