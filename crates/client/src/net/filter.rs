//! Request and response admission rules.
//!
//! A broad keyword whitelist catches everything that might be a data call;
//! the content-type and body-shape checks downstream keep the noise out of
//! the JSON parser. Ordering matters: extension and telemetry rejection
//! short-circuit before the keyword check runs.

/// Keywords a candidate URL must contain at least one of.
const TARGET_KEYWORDS: &[&str] = &[
    "list",
    "search",
    "feed",
    "query",
    "api",
    "item",
    "category",
    "recommend",
    "material",
    "get",
    "find",
];

/// Static-asset extensions that disqualify a URL outright.
///
/// `.jpg`/`.png` are deliberately absent so `api?file=image.jpg` still
/// qualifies; the content-type check guards against parsing actual images.
const IGNORED_EXTENSIONS: &[&str] = &[".css", ".js", ".woff", ".ttf", ".ico", ".svg", ".mp4"];

/// Logging/telemetry substrings that disqualify a URL.
const TELEMETRY_MARKERS: &[&str] = &["log", "pixel", "telemetry"];

/// Decide whether a request URL is worth observing at all.
///
/// Three stages, substring-based and case-insensitive: blacklist by
/// extension, blacklist by purpose, whitelist by keyword.
pub fn is_target_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let low = url.to_lowercase();

    if IGNORED_EXTENSIONS.iter().any(|ext| low.contains(ext)) {
        return false;
    }
    if TELEMETRY_MARKERS.iter().any(|m| low.contains(m)) {
        return false;
    }

    TARGET_KEYWORDS.iter().any(|k| low.contains(k))
}

/// Decide whether a completed response body should enter the JSON parser.
///
/// A present content-type that does not mention json disqualifies the body
/// without reading it; an absent header falls through to the shape check.
pub fn is_json_body(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type
        && !ct.contains("json")
    {
        return false;
    }
    body.starts_with('{') || body.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_required() {
        assert!(is_target_url("https://api.capcut.com/web/material/search"));
        assert!(is_target_url("https://x.com/v1/ITEM/12"));
        assert!(!is_target_url("https://x.com/v1/session/refresh"));
        assert!(!is_target_url(""));
    }

    #[test]
    fn test_extension_blacklist_short_circuits() {
        // Contains "api" but is a static asset.
        assert!(!is_target_url("https://cdn.x.com/api-bundle.min.js"));
        assert!(!is_target_url("https://cdn.x.com/list.svg"));
        assert!(!is_target_url("https://cdn.x.com/feed-intro.mp4"));
    }

    #[test]
    fn test_telemetry_blacklist_short_circuits() {
        assert!(!is_target_url("https://api.x.com/log/search"));
        assert!(!is_target_url("https://x.com/pixel?item=3"));
        assert!(!is_target_url("https://telemetry.x.com/api/query"));
    }

    #[test]
    fn test_image_query_params_pass() {
        // .jpg is deliberately not blacklisted.
        assert!(is_target_url("https://x.com/api?file=image.jpg"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(is_target_url("https://x.com/API/Search"));
        assert!(!is_target_url("https://x.com/API/Search.SVG"));
    }

    #[test]
    fn test_json_body_content_type_gate() {
        assert!(is_json_body(Some("application/json; charset=utf-8"), "{}"));
        assert!(!is_json_body(Some("text/html"), "{\"looks\":\"like json\"}"));
        // Absent header falls through to the shape check.
        assert!(is_json_body(None, "[1,2,3]"));
        assert!(!is_json_body(None, "<html>"));
        assert!(!is_json_body(None, ""));
    }
}
