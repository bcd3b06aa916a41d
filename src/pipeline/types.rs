//! Shared types for the digest pipeline.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

static ARXIV_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A\d{4}\.\d{4,5}\z").unwrap());

// ── Paper record ────────────────────────────────────────────────────

/// One paper listing pulled out of a digest email.
///
/// The identifier always has the `NNNN.NNNNN` shape (four or five digits
/// after the dot). Every field is trimmed and non-empty, and the abstract
/// holds no newlines. Fields are read-only after construction; JSON input
/// goes through the same checks as [`PaperRecord::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaperFields")]
pub struct PaperRecord {
    arxiv_id: String,
    title: String,
    authors: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
}

impl PaperRecord {
    /// Build a record from already-captured fields.
    ///
    /// Title and authors are trimmed; the abstract is whitespace-normalized
    /// (every run of whitespace, newlines included, becomes one space).
    /// Fails on a malformed identifier or a field left empty.
    pub fn new(
        arxiv_id: &str,
        title: &str,
        authors: &str,
        abstract_text: &str,
    ) -> Result<Self, RecordError> {
        let arxiv_id = arxiv_id.trim();
        if !ARXIV_ID.is_match(arxiv_id) {
            return Err(RecordError::InvalidId(arxiv_id.to_string()));
        }

        let record = Self {
            arxiv_id: arxiv_id.to_string(),
            title: title.trim().to_string(),
            authors: authors.trim().to_string(),
            abstract_text: normalize_whitespace(abstract_text),
        };
        for (field, value) in [
            ("title", &record.title),
            ("authors", &record.authors),
            ("abstract", &record.abstract_text),
        ] {
            if value.is_empty() {
                return Err(RecordError::EmptyField { field });
            }
        }
        Ok(record)
    }

    /// arXiv identifier, e.g. `2401.00001`.
    pub fn arxiv_id(&self) -> &str {
        &self.arxiv_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free-text author list as printed in the digest.
    pub fn authors(&self) -> &str {
        &self.authors
    }

    /// Single-line abstract.
    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    /// Canonical abstract page for this paper.
    pub fn abs_url(&self) -> String {
        abs_url(&self.arxiv_id)
    }

    /// Lower-cased `title abstract authors`, the text keywords are matched against.
    pub(crate) fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.abstract_text, self.authors).to_lowercase()
    }
}

/// Wire shape of a record before validation.
#[derive(Deserialize)]
struct PaperFields {
    arxiv_id: String,
    title: String,
    authors: String,
    #[serde(rename = "abstract")]
    abstract_text: String,
}

impl TryFrom<PaperFields> for PaperRecord {
    type Error = RecordError;

    fn try_from(raw: PaperFields) -> Result<Self, Self::Error> {
        Self::new(&raw.arxiv_id, &raw.title, &raw.authors, &raw.abstract_text)
    }
}

/// Abstract page URL for an identifier. This is also the terminator the
/// extractor looks for at the end of each block.
pub fn abs_url(arxiv_id: &str) -> String {
    format!("https://arxiv.org/abs/{arxiv_id}")
}

/// Collapse every run of whitespace into a single space and trim.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
