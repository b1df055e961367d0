use std::collections::HashMap;

use toc_model::OutlineEntry;

/// Case-folded title with whitespace collapsed and trailing punctuation removed.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', ':', ';'])
        .to_lowercase()
}

/// Concatenate per-chunk batches in order, dropping repeats.
///
/// An entry repeats an earlier one when the normalized titles match and the
/// pages differ by at most `page_tolerance`. The first occurrence is kept.
pub fn merge_entries(batches: Vec<Vec<OutlineEntry>>, page_tolerance: u32) -> Vec<OutlineEntry> {
    let mut seen: HashMap<String, Vec<u32>> = HashMap::new();
    let mut out = Vec::new();
    for entry in batches.into_iter().flatten() {
        let key = normalize_title(&entry.title);
        let pages = seen.entry(key).or_default();
        if pages.iter().any(|p| p.abs_diff(entry.page) <= page_tolerance) {
            continue;
        }
        pages.push(entry.page);
        out.push(entry);
    }
    out
}
