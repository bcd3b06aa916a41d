//! File-backed mail source for offline runs against a saved digest.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::channels::MailSource;
use crate::channels::email::extract_text;
use crate::error::ChannelError;

/// Reads a digest from disk.
///
/// `.eml` files are parsed as RFC822 and reduced to their text body;
/// any other file is taken as the plain body as-is.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_eml(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
    }
}

#[async_trait]
impl MailSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_digest(&self) -> Result<Option<String>, ChannelError> {
        let raw = tokio::fs::read(&self.path).await?;
        info!(path = %self.path.display(), bytes = raw.len(), "Read digest from file");

        if self.is_eml() {
            return extract_text(&raw).map(Some);
        }

        String::from_utf8(raw).map(Some).map_err(|e| {
            ChannelError::InvalidMessage(format!("{} is not UTF-8: {e}", self.path.display()))
        })
    }
}
