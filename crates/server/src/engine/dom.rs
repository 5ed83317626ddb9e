//! Candidate collection from a DOM snapshot.
//!
//! A snapshot has no layout, so the "rendered" size is whatever the markup
//! says: the `width`/`height` attribute, falling back to the page's
//! `data-natural-width`/`data-natural-height` hints, defaulting to zero.
//! Missing attributes are not errors; a zero-sized candidate simply fails
//! the size filter downstream.

use scraper::{ElementRef, Html, Selector};

/// A DOM image element observed during a scan. Ephemeral; recomputed on
/// every scan and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Resolved source URL (`src`, or the `data-bg-src` fallback).
    pub src: String,
    /// Effective width in pixels.
    pub width: u32,
    /// Effective height in pixels.
    pub height: u32,
    /// Position among all `<img>` elements in document order.
    pub dom_index: usize,
    /// Whether the element sits in a user-avatar region.
    pub avatar: bool,
}

/// Enumerate every image element of the snapshot, in document order.
///
/// Elements without any source URL are dropped but still consume a DOM
/// index, so indices stay aligned with the document.
pub fn collect_candidates(html: &str) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").expect("invalid selector");

    document
        .select(&selector)
        .enumerate()
        .filter_map(|(dom_index, element)| {
            let src = source_url(&element)?;
            Some(Candidate {
                src: src.to_string(),
                width: dimension(&element, "width", "data-natural-width"),
                height: dimension(&element, "height", "data-natural-height"),
                dom_index,
                avatar: in_avatar_region(&element),
            })
        })
        .collect()
}

fn source_url<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    element
        .value()
        .attr("src")
        .filter(|s| !s.is_empty())
        .or_else(|| element.value().attr("data-bg-src").filter(|s| !s.is_empty()))
}

fn dimension(element: &ElementRef<'_>, attr: &str, natural_attr: &str) -> u32 {
    element
        .value()
        .attr(attr)
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| element.value().attr(natural_attr).and_then(|v| v.trim().parse().ok()))
        .unwrap_or(0)
}

fn in_avatar_region(element: &ElementRef<'_>) -> bool {
    if element.value().classes().any(|c| c == "avatar") {
        return true;
    }

    // closest(".user-avatar") semantics: the element itself counts too.
    if element.value().classes().any(|c| c == "user-avatar") {
        return true;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().classes().any(|c| c == "user-avatar"))
}
