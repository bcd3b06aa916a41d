//! Dry-run sink: prints the report instead of sending it.

use async_trait::async_trait;

use crate::channels::MailSink;
use crate::error::ChannelError;

pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }

    /// Text printed for one report.
    pub fn render(recipient: &str, subject: &str, body: &str) -> String {
        format!("To: {recipient}\nSubject: {subject}\n\n{body}")
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        println!("{}", Self::render(recipient, subject, body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_has_headers_then_body() {
        assert_eq!(
            StdoutSink::render("me@test.com", "Filtered Papers", "Paper 1:"),
            "To: me@test.com\nSubject: Filtered Papers\n\nPaper 1:"
        );
    }

    #[tokio::test]
    async fn send_never_fails() {
        assert!(StdoutSink::new().send("a@b.c", "s", "b").await.is_ok());
    }
}
