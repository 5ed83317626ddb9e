//! URL fingerprint extraction and the fingerprint index.
//!
//! The origin's asset pipeline embeds the same 32-character lowercase hex
//! token in every rendition of an asset, so the token works as a
//! content-identity key correlating a thumbnail URL with its
//! full-resolution counterpart.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::record::ImageRecord;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[a-f0-9]{32}").expect("invalid fingerprint pattern"))
}

/// Extract the first 32-hex-char fingerprint embedded in a URL.
///
/// No match is "no fingerprint", not an error.
pub fn fingerprint(url: &str) -> Option<&str> {
    pattern().find(url).map(|m| m.as_str())
}

/// Mapping from fingerprint to full-resolution URL.
///
/// Built fresh on every correlation pass; both the `url` and the `thumb` of
/// every record contribute a key, each pointing at `url`.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    map: HashMap<String, String>,
}

impl FingerprintIndex {
    /// Build the index from the current record store contents.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a ImageRecord>) -> Self {
        let mut map = HashMap::new();
        for record in records {
            if let Some(fp) = fingerprint(&record.url) {
                map.insert(fp.to_string(), record.url.clone());
            }
            if let Some(thumb) = record.thumb.as_deref()
                && let Some(fp) = fingerprint(thumb)
            {
                map.insert(fp.to_string(), record.url.clone());
            }
        }
        Self { map }
    }

    /// Look up the full-resolution URL for a fingerprint.
    pub fn get(&self, fp: &str) -> Option<&str> {
        self.map.get(fp).map(String::as_str)
    }

    /// Resolve a candidate URL: fingerprint it and look the token up.
    pub fn resolve(&self, url: &str) -> Option<&str> {
        fingerprint(url).and_then(|fp| self.get(fp))
    }

    /// Number of distinct fingerprints indexed.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
