//! Paper extraction from the plain-text body of an arXiv digest email.
//!
//! A digest lists papers in blocks of this shape:
//!
//! ```text
//! arXiv:2401.00001
//! Date: Mon, 1 Jan 2024 10:00:00 GMT   (12kb)
//!
//! Title: Graph Neural Networks for Routing
//! Authors: A. Lee, B. Kim
//! Categories: cs.LG cs.NI
//! Comments: 9 pages
//! \\
//!   We study ... networks ...
//! \\ ( https://arxiv.org/abs/2401.00001 ,  12kb)
//! ```
//!
//! Extraction is a two-phase scan. Phase one finds every `arXiv:<id>`
//! header followed by `Date:`; each header owns the text up to the next
//! header. Phase two checks the `Date:`/`Title:`/`Authors:`/`Categories:`
//! sequence inside that span and then looks for the block's own abstract
//! URL, `https://arxiv.org/abs/<id>`. The abstract is whatever lies between
//! the `\\` delimiter after `Categories:` and that URL. A block that never
//! reaches its own URL is dropped, so one broken listing cannot swallow
//! the next one.

use regex::Regex;
use tracing::{debug, info};

use crate::pipeline::types::{PaperRecord, abs_url};

/// Compiled matchers for digest blocks.
pub struct PaperExtractor {
    /// Start of a block: identifier tag followed by the date field.
    header: Regex,
    /// Header fields, anchored at the start of a block span.
    fields: Regex,
}

impl PaperExtractor {
    pub fn new() -> Self {
        Self {
            header: Regex::new(r"arXiv:(\d{4}\.\d{4,5})\s+Date:").unwrap(),
            fields: Regex::new(
                r"(?s)\AarXiv:(?P<id>\d{4}\.\d{4,5})\s+Date:.*?Title:\s+(?P<title>.*?)\s+Authors:\s+(?P<authors>.*?)\s+Categories:",
            )
            .unwrap(),
        }
    }

    /// Extract every well-formed paper block, in source order.
    ///
    /// Never fails: text without any block yields an empty vector and
    /// malformed blocks are skipped.
    pub fn extract(&self, content: &str) -> Vec<PaperRecord> {
        info!(bytes = content.len(), "Starting paper extraction");

        let starts: Vec<usize> = self.header.find_iter(content).map(|m| m.start()).collect();

        let mut papers = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(content.len());
            if let Some(paper) = self.parse_block(&content[start..end]) {
                papers.push(paper);
            }
        }

        let skipped = starts.len() - papers.len();
        info!(
            candidates = starts.len(),
            extracted = papers.len(),
            skipped,
            "Finished paper extraction"
        );
        papers
    }

    /// Parse one block span. `None` if any required part is missing.
    fn parse_block(&self, block: &str) -> Option<PaperRecord> {
        let Some(caps) = self.fields.captures(block) else {
            debug!(
                header = %block.lines().next().unwrap_or_default(),
                "Skipping block: header fields incomplete"
            );
            return None;
        };

        let arxiv_id = &caps["id"];
        let after_categories = &block[caps.get(0)?.end()..];

        let Some(url_pos) = find_own_url(after_categories, arxiv_id) else {
            debug!(arxiv_id, "Skipping block: no abstract URL for this identifier");
            return None;
        };

        let abstract_text = abstract_span(&after_categories[..url_pos]);
        match PaperRecord::new(arxiv_id, &caps["title"], &caps["authors"], abstract_text) {
            Ok(paper) => Some(paper),
            Err(e) => {
                debug!(arxiv_id, error = %e, "Skipping block");
                None
            }
        }
    }
}

impl Default for PaperExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract paper records from a digest body with a fresh extractor.
pub fn extract(content: &str) -> Vec<PaperRecord> {
    PaperExtractor::new().extract(content)
}

/// Byte offset of the first occurrence of this paper's abstract URL.
///
/// A hit followed by another digit belongs to a longer identifier
/// (`2401.0001` vs `2401.00012`) and is ignored.
fn find_own_url(text: &str, arxiv_id: &str) -> Option<usize> {
    let url = abs_url(arxiv_id);
    text.match_indices(&url)
        .map(|(pos, _)| pos)
        .find(|&pos| {
            !text[pos + url.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
}

/// Slice out the abstract from the text between `Categories:` and the URL.
///
/// The abstract starts after the first line made only of backslashes
/// (the `\\` delimiter). Without one, or when that line is the closing
/// `\\` right before the URL, it starts on the line after `Categories:`.
/// A trailing `\\ (` right before the URL is dropped.
fn abstract_span(body: &str) -> &str {
    let mut lines = body.split_inclusive('\n');
    let Some(categories_line) = lines.next() else {
        return "";
    };

    let mut offset = categories_line.len();
    let mut start = offset;
    for line in lines {
        offset += line.len();
        let trimmed = line.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c == '\\') {
            // Only `(` left before the URL: this line closes the abstract.
            if !matches!(body[offset..].trim(), "" | "(") {
                start = offset;
            }
            break;
        }
    }

    let text = body[start..].trim_end();
    let text = text.strip_suffix('(').unwrap_or(text).trim_end();
    text.trim_end_matches('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, title: &str, authors: &str, abstract_text: &str, url_id: &str) -> String {
        format!(
            "------------------------------------------------------------------------------\n\
             \\\\\n\
             arXiv:{id}\n\
             Date: Mon, 1 Jan 2024 10:00:00 GMT   (12kb)\n\
             \n\
             Title: {title}\n\
             Authors: {authors}\n\
             Categories: cs.LG cs.NI\n\
             Comments: 9 pages, 3 figures\n\
             \\\\\n\
             {abstract_text}\n\
             \\\\ ( https://arxiv.org/abs/{url_id} ,  12kb)\n"
        )
    }

    const PREAMBLE: &str = "Submissions to: Computer Science\nreceived from Fri 29 Dec 23 19:00:00 GMT\n";
    const FOOTER: &str = "%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%--%%\n\
                          To unsubscribe, e-mail To: cs@arXiv.org, Subject: cancel\n";

    #[test]
    fn extracts_single_block_verbatim() {
        let text = format!(
            "{PREAMBLE}{}{FOOTER}",
            block(
                "2401.00001",
                "Graph Neural Networks for Routing",
                "A. Lee, B. Kim",
                "  We study ... networks ...",
                "2401.00001",
            )
        );
        let papers = extract(&text);
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.arxiv_id(), "2401.00001");
        assert_eq!(p.title(), "Graph Neural Networks for Routing");
        assert_eq!(p.authors(), "A. Lee, B. Kim");
        assert_eq!(p.abstract_text(), "We study ... networks ...");
    }

    #[test]
    fn extracts_blocks_in_source_order() {
        let text = format!(
            "{PREAMBLE}{}{}{}{FOOTER}",
            block("2401.00003", "Third", "C", "Gamma.", "2401.00003"),
            block("2401.00001", "First", "A", "Alpha.", "2401.00001"),
            block("2401.00002", "Second", "B", "Beta.", "2401.00002"),
        );
        let ids: Vec<_> = extract(&text)
            .iter()
            .map(|p| p.arxiv_id().to_string())
            .collect();
        assert_eq!(ids, ["2401.00003", "2401.00001", "2401.00002"]);
    }

    #[test]
    fn no_blocks_yields_empty() {
        assert!(extract("").is_empty());
        assert!(extract("Hello,\n\nNothing to see here today.\n").is_empty());
        assert!(extract(PREAMBLE).is_empty());
    }

    #[test]
    fn mismatched_url_is_not_captured() {
        let text = format!(
            "{}{}",
            block("2401.00001", "Wrong URL", "A", "Alpha.", "2401.99999"),
            block("2401.00002", "Good", "B", "Beta.", "2401.00002"),
        );
        let papers = extract(&text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].arxiv_id(), "2401.00002");
        assert_eq!(papers[0].abstract_text(), "Beta.");
    }

    #[test]
    fn missing_url_does_not_bleed_into_next_block() {
        // First block lost its terminator; the second block quotes the
        // first paper's URL in its abstract.
        let broken = "arXiv:2401.00001\nDate: Mon, 1 Jan 2024\n\nTitle: Broken\nAuthors: A\n\
                      Categories: cs.LG\n\\\\\n  Alpha.\n";
        let text = format!(
            "{broken}{}",
            block(
                "2401.00002",
                "Follow-up",
                "B",
                "Extends https://arxiv.org/abs/2401.00001 further.",
                "2401.00002",
            )
        );
        let papers = extract(&text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].arxiv_id(), "2401.00002");
        assert_eq!(papers[0].title(), "Follow-up");
    }

    #[test]
    fn block_missing_authors_is_skipped() {
        let broken = "arXiv:2401.00001\nDate: Mon, 1 Jan 2024\n\nTitle: No authors\n\
                      Categories: cs.LG\n\\\\\n  Alpha.\n\\\\ ( https://arxiv.org/abs/2401.00001 , 1kb)\n";
        let text = format!(
            "{broken}{}",
            block("2401.00002", "Fine", "B", "Beta.", "2401.00002")
        );
        let papers = extract(&text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].arxiv_id(), "2401.00002");
    }

    #[test]
    fn abstract_is_whitespace_normalized() {
        let text = block(
            "2312.12345",
            "T",
            "A",
            "  Line one of the abstract\n  continues here,\n\n  and ends here.",
            "2312.12345",
        );
        let papers = extract(&text);
        assert_eq!(
            papers[0].abstract_text(),
            "Line one of the abstract continues here, and ends here."
        );
    }

    #[test]
    fn double_delimiter_layout() {
        let text = "arXiv:2401.00007\nDate: Tue, 2 Jan 2024\n\nTitle: Two lines\nAuthors: Z. Q\n\
                    Categories: math.CO\n\\\\\n  Body text.\n\\\\\n( https://arxiv.org/abs/2401.00007 , 5kb)\n";
        let papers = extract(text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].abstract_text(), "Body text.");
    }

    #[test]
    fn closing_delimiter_only_layout() {
        let text = "arXiv:2401.00001\nDate: Mon\nTitle: T\nAuthors: A\nCategories: cs.LG\n\
                    \x20 Body text.\n\\\\\n( https://arxiv.org/abs/2401.00001 , 5kb)\n";
        let papers = extract(text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].arxiv_id(), "2401.00001");
        assert_eq!(papers[0].abstract_text(), "Body text.");
    }

    #[test]
    fn closing_delimiter_on_url_line_without_opening_one() {
        let text = "arXiv:2401.00001\nDate: Mon\nTitle: T\nAuthors: A\nCategories: cs.LG\n\
                    \x20 Body text.\n\\\\ ( https://arxiv.org/abs/2401.00001 , 5kb)\n";
        let papers = extract(text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].abstract_text(), "Body text.");
    }

    #[test]
    fn abstract_without_delimiter_starts_after_categories_line() {
        let text = "arXiv:2401.00001\nDate: Mon, 1 Jan 2024\nTitle: Graph Neural Networks for Routing\n\
                    Authors: A. Lee, B. Kim\nCategories: cs.LG\nWe study ... networks ...\n\
                    https://arxiv.org/abs/2401.00001\n";
        let papers = extract(text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].abstract_text(), "We study ... networks ...");
    }

    #[test]
    fn latex_backslash_in_abstract_is_kept() {
        let text = block("2401.00001", "T", "A", "  Bounds of $\\alpha$-stable laws.", "2401.00001");
        let papers = extract(&text);
        assert_eq!(papers[0].abstract_text(), "Bounds of $\\alpha$-stable laws.");
    }

    #[test]
    fn longer_identifier_url_is_not_a_match() {
        let text = "arXiv:2401.0001\nDate: Mon, 1 Jan 2024\nTitle: Old style\nAuthors: A\n\
                    Categories: cs.LG\n\\\\\n  Alpha.\n\\\\ ( https://arxiv.org/abs/2401.00012 , 1kb)\n";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn multiline_title_is_trimmed() {
        let text = block(
            "2401.00001",
            "A Very Long Title That Wraps\n  Onto a Second Line",
            "A. Lee",
            "Alpha.",
            "2401.00001",
        );
        let papers = extract(&text);
        assert_eq!(
            papers[0].title(),
            "A Very Long Title That Wraps\n  Onto a Second Line"
        );
    }

    #[test]
    fn crlf_line_endings() {
        let text = block("2401.00001", "Title", "A. Lee", "  Alpha\n  beta.", "2401.00001")
            .replace('\n', "\r\n");
        let papers = extract(&text);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title(), "Title");
        assert_eq!(papers[0].authors(), "A. Lee");
        assert_eq!(papers[0].abstract_text(), "Alpha beta.");
    }
}
