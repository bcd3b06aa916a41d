//! Mail collaborators: where the digest comes from and where the report goes.
//!
//! Both traits are pure I/O. Extraction, filtering and report formatting
//! live in `pipeline`.

pub mod email;
pub mod file;
pub mod stdout;

use async_trait::async_trait;

use crate::error::ChannelError;

pub use email::{EmailConfig, ImapSource, SmtpSink};
pub use file::FileSource;
pub use stdout::StdoutSink;

/// Supplies the decoded plain-text body of one digest email.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Source name for logs (e.g. "imap", "file").
    fn name(&self) -> &str;

    /// Fetch the digest body. `Ok(None)` when no email matched.
    async fn fetch_digest(&self) -> Result<Option<String>, ChannelError>;
}

/// Delivers a finished report.
#[async_trait]
pub trait MailSink: Send + Sync {
    /// Sink name for logs (e.g. "smtp", "stdout").
    fn name(&self) -> &str;

    /// Deliver `body` to `recipient` under `subject`.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError>;
}
