// src/extract.rs
//! Asset extraction: find every image URL inside an arbitrary JSON document.

use serde_json::Value;

use crate::AssetSet;

/// Suffixes (lowercase) that mark a string as an image asset.
pub const IMAGE_FORMATS: [&str; 7] = [".png", ".jpg", ".jpeg", ".webp", ".gif", ".tga", ".bmp"];

/// True if the path part of `s` (everything before the first `?`) ends with a known
/// image suffix, compared case-insensitively.
pub fn is_image_url(s: &str) -> bool {
    let path = s.split('?').next().unwrap_or_default().to_ascii_lowercase();
    IMAGE_FORMATS.iter().any(|ext| path.ends_with(ext))
}

/// Collect every string leaf in `data` that looks like an image URL.
///
/// Walks objects and arrays with an explicit stack, so arbitrarily deep documents
/// cannot overflow the call stack.
pub fn extract_image_urls(data: &Value) -> AssetSet {
    let mut out = AssetSet::new();
    let mut stack: Vec<&Value> = vec![data];

    while let Some(node) = stack.pop() {
        match node {
            Value::String(s) if is_image_url(s) => {
                out.insert(s.clone());
            }
            Value::Object(map) => stack.extend(map.values()),
            Value::Array(items) => stack.extend(items.iter()),
            _ => {}
        }
    }

    tracing::debug!(count = out.len(), "extracted image urls");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suffix_check_ignores_query_and_case() {
        assert!(is_image_url("https://cdn.example.com/a/B.PNG?width=128&v=2"));
        assert!(is_image_url("http://x/y.jpeg"));
        assert!(is_image_url("x.tga"));
        assert!(!is_image_url("https://cdn.example.com/a.png.html"));
        assert!(!is_image_url("https://cdn.example.com/page?img=a.png"));
        assert!(!is_image_url(""));
    }

    #[test]
    fn collects_nested_strings_from_objects_and_arrays() {
        let doc = json!({
            "title": "Item shop",
            "image": "https://cdn/x/hero.webp",
            "tiles": [
                {"img": "https://cdn/x/tile1.jpg?size=2", "count": 3},
                {"deep": {"deeper": ["https://cdn/x/tile2.GIF", "not-an-image.txt", 42, null]}}
            ],
            "flags": [true, false]
        });
        let urls = extract_image_urls(&doc);
        let expected: AssetSet = [
            "https://cdn/x/hero.webp",
            "https://cdn/x/tile1.jpg?size=2",
            "https://cdn/x/tile2.GIF",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn duplicates_collapse() {
        let doc = json!({"a": "http://x/img.png", "b": ["http://x/img.png"]});
        assert_eq!(extract_image_urls(&doc).len(), 1);
    }

    #[test]
    fn scalars_and_empty_containers_yield_nothing() {
        assert!(extract_image_urls(&json!(null)).is_empty());
        assert!(extract_image_urls(&json!(12)).is_empty());
        assert!(extract_image_urls(&json!({})).is_empty());
        assert!(extract_image_urls(&json!([])).is_empty());
    }

    #[test]
    fn very_deep_nesting_terminates() {
        let mut doc = json!("http://x/bottom.bmp");
        for i in 0..1_000 {
            doc = if i % 2 == 0 { json!([doc]) } else { json!({ "n": doc }) };
        }
        let urls = extract_image_urls(&doc);
        assert!(urls.contains("http://x/bottom.bmp"));
    }
}
