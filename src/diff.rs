// src/diff.rs
//! Change detection between the last known state and a fresh fetch.

use serde_json::Value;

use crate::extract::extract_image_urls;
use crate::store::NewsHashSet;
use crate::AssetSet;

/// Return the assets in `current` that were not in `slot`, then make `slot` equal
/// to `current`. Assets that disappeared are dropped from `slot`, not kept.
pub fn replace_and_diff(slot: &mut AssetSet, current: AssetSet) -> AssetSet {
    let added: AssetSet = current.difference(slot).cloned().collect();
    *slot = current;
    added
}

/// Hash-based diff for news items.
///
/// Each item carrying a non-empty `contentHash` that is not yet in `known` is new;
/// it is represented by exactly one image (the smallest URL, so the pick is stable).
/// Afterwards `known` holds exactly the hashes present in `items`: hashes missing
/// from this fetch are forgotten.
pub fn diff_news_items(known: &mut NewsHashSet, items: &[Value]) -> AssetSet {
    let mut seen = NewsHashSet::new();
    let mut added = AssetSet::new();

    for item in items {
        let Some(hash) = item
            .get("contentHash")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
        else {
            continue;
        };
        seen.insert(hash.to_string());

        if known.contains(hash) {
            continue;
        }
        match extract_image_urls(item).into_iter().next() {
            Some(url) => {
                tracing::debug!(content_hash = hash, %url, "new news item");
                added.insert(url);
            }
            None => tracing::debug!(content_hash = hash, "new news item has no image"),
        }
    }

    *known = seen;
    added
}
