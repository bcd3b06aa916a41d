//! Plain-text report sent to the recipient.

use crate::pipeline::types::PaperRecord;

/// Subject line of every report.
pub const REPORT_SUBJECT: &str = "Filtered Papers";

/// Body sent when papers were found but none matched.
pub const NO_MATCH_BODY: &str = "No papers matched the provided keywords.";

/// Default abstract preview length, in characters.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

const HEADER: &str = "Here are the filtered papers relevant to your research:\n\n";

/// Render the report body for the matched papers.
///
/// `preview_chars` bounds each abstract; `0` disables truncation.
pub fn format_report(papers: &[PaperRecord], preview_chars: usize) -> String {
    if papers.is_empty() {
        return NO_MATCH_BODY.to_string();
    }

    let mut body = String::from(HEADER);
    for (i, paper) in papers.iter().enumerate() {
        body.push_str(&format!(
            "Paper {}:\nTitle: {}\narXiv ID: {}\nAuthors: {}\nAbstract: {}\n{}\n\n",
            i + 1,
            paper.title(),
            paper.arxiv_id(),
            paper.authors(),
            abstract_preview(paper.abstract_text(), preview_chars),
            "-".repeat(40),
        ));
    }
    body
}

/// First `max_chars` characters of an abstract, with `...` when cut.
pub fn abstract_preview(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
