//! Keyword relevance filter.
//!
//! A paper is kept when any keyword is a case-insensitive substring of
//! `title abstract authors`. Matching is plain substring search, so
//! `net` matches `network`. An empty keyword set keeps nothing.

use tracing::debug;

use crate::pipeline::types::PaperRecord;

/// Select the papers that mention at least one keyword, preserving order.
pub fn filter<S: AsRef<str>>(records: &[PaperRecord], keywords: &[S]) -> Vec<PaperRecord> {
    if records.is_empty() {
        return Vec::new();
    }

    let keywords: Vec<String> = keywords.iter().map(|k| k.as_ref().to_lowercase()).collect();

    let matched: Vec<PaperRecord> = records
        .iter()
        .filter(|paper| {
            let text = paper.search_text();
            keywords.iter().any(|kw| text.contains(kw.as_str()))
        })
        .cloned()
        .collect();

    debug!(
        total = records.len(),
        matched = matched.len(),
        keywords = keywords.len(),
        "Filtered papers by keyword"
    );
    matched
}

/// Parse a comma-separated keyword list.
///
/// Entries are trimmed and blanks dropped, so an unset or empty setting
/// gives an empty keyword set rather than a single `""` that would match
/// every paper.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
