//! Comment differ. System-generated entries are filtered out before any
//! comparison and are never copied.

use std::collections::HashSet;

use tasksync_core::types::Item;

/// Texts of the human-authored comments on `item`, in order.
pub fn human_comments(item: &Item) -> Vec<&str> {
    item.comments
        .iter()
        .filter(|comment| !comment.is_system())
        .map(|comment| comment.text.as_str())
        .collect()
}

/// Source comment texts not present verbatim on the destination, in source
/// order. Repeated source texts are all kept when absent from the
/// destination.
pub fn missing_comments<'a>(source: &[&'a str], destination: &[&str]) -> Vec<&'a str> {
    let present: HashSet<&str> = destination.iter().copied().collect();
    source
        .iter()
        .copied()
        .filter(|text| !present.contains(text))
        .collect()
}
