//! The image record and scan entry data model.

use serde::{Deserialize, Serialize};

/// A discovered full-resolution asset reference.
///
/// Identity is the `url`; stores never update an existing record, only
/// insert new distinct ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ImageRecord {
    /// Absolute full-resolution URL.
    pub url: String,
    /// Lower-fidelity URL or opaque identifier for the same asset, when the
    /// payload carried one.
    pub thumb: Option<String>,
}

impl ImageRecord {
    /// Create a record with no thumbnail hint.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), thumb: None }
    }

    /// Create a record carrying a thumbnail hint.
    pub fn with_thumb(url: impl Into<String>, thumb: impl Into<String>) -> Self {
        Self { url: url.into(), thumb: Some(thumb.into()) }
    }
}

/// One entry of a scan result.
///
/// `url` is the chosen URL (full-resolution when matched), `backup` the URL
/// the DOM itself carried, `dom_index` the element's position in document
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScanEntry {
    /// The chosen URL.
    pub url: String,
    /// The original DOM source URL.
    pub backup: String,
    /// DOM enumeration index of the element.
    pub dom_index: usize,
    /// Whether the entry was matched against a captured full-resolution record.
    pub is_high_res: bool,
}
