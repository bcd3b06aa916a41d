//! Digest processing pipeline.
//!
//! One run flows through:
//! 1. `MailSource::fetch_digest()`: body of today's digest email
//! 2. `PaperExtractor::extract()`: paper blocks → `PaperRecord`s
//! 3. `filter()`: keep papers mentioning any keyword
//! 4. `format_report()` + `MailSink::send()`: one report to the recipient
//!
//! Steps 2 and 3 are pure; only the collaborators at either end do I/O.

pub mod extractor;
pub mod filter;
pub mod report;
pub mod types;

use tracing::{info, warn};

use crate::channels::{MailSink, MailSource};
use crate::error::PipelineError;
use crate::pipeline::extractor::PaperExtractor;
use crate::pipeline::report::{REPORT_SUBJECT, format_report};
use crate::pipeline::types::PaperRecord;

pub use extractor::extract;
pub use filter::filter;

/// What a single run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The source had no digest; nothing was sent.
    NoEmail,
    /// The digest held no recognizable paper blocks; nothing was sent.
    NoPapers,
    /// A report went out. `matched` may be empty (the "no papers matched" report).
    Sent {
        extracted: usize,
        matched: Vec<PaperRecord>,
    },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoEmail => "no_email",
            Self::NoPapers => "no_papers",
            Self::Sent { .. } => "sent",
        }
    }
}

/// Source → extract → filter → report → sink, wired once and run as often
/// as needed. Runs share no state.
pub struct DigestPipeline {
    source: Box<dyn MailSource>,
    sink: Box<dyn MailSink>,
    extractor: PaperExtractor,
    recipient: String,
    keywords: Vec<String>,
    preview_chars: usize,
}

impl DigestPipeline {
    pub fn new(
        source: Box<dyn MailSource>,
        sink: Box<dyn MailSink>,
        recipient: impl Into<String>,
        keywords: Vec<String>,
        preview_chars: usize,
    ) -> Self {
        Self {
            source,
            sink,
            extractor: PaperExtractor::new(),
            recipient: recipient.into(),
            keywords,
            preview_chars,
        }
    }

    /// Execute one run.
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        info!(source = self.source.name(), "Fetching digest");
        let Some(content) = self
            .source
            .fetch_digest()
            .await
            .map_err(PipelineError::Source)?
        else {
            info!("No emails found with the specified criteria");
            return Ok(RunOutcome::NoEmail);
        };

        let papers = self.extractor.extract(&content);
        if papers.is_empty() {
            info!("No papers found in the email");
            return Ok(RunOutcome::NoPapers);
        }

        if self.keywords.is_empty() {
            warn!("Keyword list is empty; no paper can match");
        }
        let matched = filter(&papers, &self.keywords);
        info!(
            extracted = papers.len(),
            matched = matched.len(),
            "Filtered papers"
        );

        let body = format_report(&matched, self.preview_chars);
        self.sink
            .send(&self.recipient, REPORT_SUBJECT, &body)
            .await
            .map_err(PipelineError::Sink)?;
        info!(sink = self.sink.name(), recipient = %self.recipient, "Report delivered");

        Ok(RunOutcome::Sent {
            extracted: papers.len(),
            matched,
        })
    }
}
