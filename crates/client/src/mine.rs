//! Recursive extraction of image records from arbitrary JSON payloads.
//!
//! Traversal is depth-limited to bound cost against unbounded or hostile
//! payloads, and long or known-irrelevant keys are pruned so one oversized
//! unrelated subtree cannot dominate a drain slice.

use serde_json::{Map, Value};

use capsift_core::ImageRecord;

/// Keys whose subtrees are never worth descending into.
const PRUNED_KEYS: &[&str] = &["common_attr", "extra"];

/// Keys longer than this are pruned outright.
const MAX_KEY_LEN: usize = 25;

/// Mine an arbitrary JSON value for embedded image records.
///
/// Nodes deeper than `max_depth` are not visited; the root is depth 0.
/// Malformed items are skipped without aborting the wider traversal, and
/// non-container values yield nothing.
pub fn mine(value: &Value, max_depth: usize) -> Vec<ImageRecord> {
    let mut out = Vec::new();
    scan_node(value, 0, max_depth, &mut out);
    out
}

fn scan_node(value: &Value, depth: usize, max_depth: usize, out: &mut Vec<ImageRecord>) {
    if depth > max_depth {
        return;
    }

    match value {
        Value::Object(map) => {
            // A node carrying its own large_images array is a complete item;
            // nothing below it can be another one.
            if map.get("large_images").is_some_and(Value::is_array) {
                if let Some(record) = extract_item(map) {
                    out.push(record);
                }
                return;
            }

            // The nested image.large_images shape marks an item too, but
            // siblings of `image` may hold further items.
            if nested_image_shape(map)
                && let Some(record) = extract_item(map)
            {
                out.push(record);
            }

            for (key, child) in map {
                if key.len() > MAX_KEY_LEN || PRUNED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                scan_node(child, depth + 1, max_depth, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_node(item, depth + 1, max_depth, out);
            }
        }
        _ => {}
    }
}

fn nested_image_shape(map: &Map<String, Value>) -> bool {
    map.get("image")
        .and_then(Value::as_object)
        .and_then(|image| image.get("large_images"))
        .is_some_and(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Pull a record out of a candidate item.
///
/// Branch priority mirrors the payload shapes observed in the wild: a
/// non-empty `large_images`, then a non-empty `image.large_images`, then a
/// bare `image_url` string. The chosen branch is final even when its
/// `image_url` turns out to be missing; such items are dropped, not
/// retried against later branches.
fn extract_item(item: &Map<String, Value>) -> Option<ImageRecord> {
    let best = if let Some(arr) = non_empty_array(item.get("large_images")) {
        arr[0].get("image_url").and_then(Value::as_str)
    } else if let Some(arr) =
        non_empty_array(item.get("image").and_then(Value::as_object).and_then(|i| i.get("large_images")))
    {
        arr[0].get("image_url").and_then(Value::as_str)
    } else {
        item.get("image_url").and_then(Value::as_str)
    };

    let best = best?;
    if !best.contains("http") {
        return None;
    }

    let mut thumb = item
        .get("cover")
        .and_then(|cover| cover.get("url_list"))
        .and_then(|list| list.get(0))
        .and_then(Value::as_str);

    // A direct uri wins over the cover hint when both exist.
    if let Some(uri) = item.get("uri").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        thumb = Some(uri);
    }

    Some(ImageRecord { url: best.to_string(), thumb: thumb.map(str::to_string) })
}

fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array).filter(|a| !a.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEPTH: usize = 8;

    #[test]
    fn test_direct_large_images() {
        let payload = json!({
            "large_images": [{"image_url": "https://cdn/full.jpg"}],
            "cover": {"url_list": ["https://cdn/thumb.jpg"]}
        });
        let records = mine(&payload, DEPTH);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://cdn/full.jpg");
        assert_eq!(records[0].thumb.as_deref(), Some("https://cdn/thumb.jpg"));
    }

    #[test]
    fn test_nested_image_shape_keeps_descending() {
        let payload = json!({
            "image": {"large_images": [{"image_url": "https://cdn/a.jpg"}]},
            "children": [
                {"large_images": [{"image_url": "https://cdn/b.jpg"}]}
            ]
        });
        let records = mine(&payload, DEPTH);
        let urls: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
        // The nested shape is extracted at the node itself and again when
        // descent reaches the inner `image` map; the capture store's
        // idempotent insert absorbs the duplicate.
        assert_eq!(urls, vec!["https://cdn/a.jpg", "https://cdn/b.jpg", "https://cdn/a.jpg"]);
    }

    #[test]
    fn test_large_images_node_stops_descent() {
        // The nested item sits below a node that already has large_images,
        // so it must not be reached.
        let payload = json!({
            "large_images": [{"image_url": "https://cdn/outer.jpg"}],
            "inner": {"large_images": [{"image_url": "https://cdn/inner.jpg"}]}
        });
        let records = mine(&payload, DEPTH);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://cdn/outer.jpg");
    }

    #[test]
    fn test_bare_image_url_needs_a_flagged_item() {
        // A bare image_url on an otherwise unflagged node is not a record;
        // only nodes marked by the large_images rules become items.
        let unflagged = json!({"data": {"image_url": "http://cdn/direct.webp"}});
        assert!(mine(&unflagged, DEPTH).is_empty());

        // Flagged by a truthy image.large_images that carries no usable
        // array, the bare field is the last extraction fallback.
        let flagged = json!({
            "image": {"large_images": true},
            "image_url": "http://cdn/direct.webp"
        });
        let records = mine(&flagged, DEPTH);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "http://cdn/direct.webp");
        assert!(records[0].thumb.is_none());
    }

    #[test]
    fn test_chosen_branch_is_final() {
        // large_images is non-empty but its first element has no image_url;
        // the bare image_url must not be consulted.
        let payload = json!({
            "large_images": [{"width": 1024}],
            "image_url": "https://cdn/ignored.jpg"
        });
        assert!(mine(&payload, DEPTH).is_empty());
    }

    #[test]
    fn test_empty_large_images_falls_through() {
        let payload = json!({
            "large_images": [],
            "image_url": "https://cdn/fallback.jpg"
        });
        let records = mine(&payload, DEPTH);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://cdn/fallback.jpg");
    }

    #[test]
    fn test_non_http_url_rejected() {
        let payload = json!({"large_images": [{"image_url": "data:image/png;base64,xyz"}]});
        assert!(mine(&payload, DEPTH).is_empty());
    }

    #[test]
    fn test_uri_overrides_cover_hint() {
        let payload = json!({
            "large_images": [{"image_url": "https://cdn/full.jpg"}],
            "cover": {"url_list": ["https://cdn/cover.jpg"]},
            "uri": "tos-alisg-0123456789abcdef0123456789abcdef"
        });
        let records = mine(&payload, DEPTH);
        assert_eq!(records[0].thumb.as_deref(), Some("tos-alisg-0123456789abcdef0123456789abcdef"));
    }

    #[test]
    fn test_depth_cap_boundary() {
        fn nested(levels: usize) -> Value {
            let mut value = json!({"large_images": [{"image_url": "https://cdn/deep.jpg"}]});
            for _ in 0..levels {
                value = json!({"a": value});
            }
            value
        }

        // Item node ends up at depth == levels.
        assert_eq!(mine(&nested(8), DEPTH).len(), 1);
        assert_eq!(mine(&nested(9), DEPTH).len(), 0);
    }

    #[test]
    fn test_pruned_keys() {
        let inside_pruned = json!({
            "common_attr": {"large_images": [{"image_url": "https://cdn/x.jpg"}]},
            "other": null
        });
        assert!(mine(&inside_pruned, DEPTH).is_empty());

        let inside_other = json!({
            "payload": {"large_images": [{"image_url": "https://cdn/x.jpg"}]},
            "other": null
        });
        assert_eq!(mine(&inside_other, DEPTH).len(), 1);
    }

    #[test]
    fn test_long_keys_pruned() {
        let payload = json!({
            "this_key_is_way_too_long_to_follow": {
                "large_images": [{"image_url": "https://cdn/x.jpg"}]
            }
        });
        assert!(mine(&payload, DEPTH).is_empty());
    }

    #[test]
    fn test_arrays_recursed_per_element() {
        let payload = json!([
            {"large_images": [{"image_url": "https://cdn/1.jpg"}]},
            {"large_images": [{"image_url": "https://cdn/2.jpg"}]},
            42,
            null
        ]);
        assert_eq!(mine(&payload, DEPTH).len(), 2);
    }

    #[test]
    fn test_scalars_yield_nothing() {
        assert!(mine(&json!(null), DEPTH).is_empty());
        assert!(mine(&json!("http://not-an-item"), DEPTH).is_empty());
        assert!(mine(&json!(12), DEPTH).is_empty());
    }
}
