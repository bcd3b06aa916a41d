//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::pipeline::filter::parse_keywords;
use crate::pipeline::report::DEFAULT_PREVIEW_CHARS;

/// Default log file, next to the working directory.
pub const DEFAULT_LOG_FILE: &str = "arxiv_filter.log";

/// Settings for a digest run that do not belong to a mail collaborator.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Who receives the report. Optional only for dry runs.
    pub recipient: Option<String>,
    /// Case-insensitive keywords; empty means nothing matches.
    pub keywords: Vec<String>,
    /// Abstract preview length in the report (0 = full abstract).
    pub preview_chars: usize,
    /// Where the file log layer writes.
    pub log_file: PathBuf,
    /// Run repeatedly at this interval instead of once.
    pub poll_interval: Option<Duration>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            keywords: Vec::new(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            poll_interval: None,
        }
    }
}

impl DigestConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let recipient = std::env::var("RECIPIENT_EMAIL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let keywords = parse_keywords(&std::env::var("KEYWORDS").unwrap_or_default());

        let preview_chars = match std::env::var("ABSTRACT_PREVIEW_CHARS") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "ABSTRACT_PREVIEW_CHARS".into(),
                message: format!("{raw:?}: {e}"),
            })?,
            Err(_) => DEFAULT_PREVIEW_CHARS,
        };

        let log_file = std::env::var("ARXIV_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));

        let poll_interval = match std::env::var("POLL_INTERVAL_SECS") {
            Ok(raw) => parse_interval(&raw)?,
            Err(_) => None,
        };

        Ok(Self {
            recipient,
            keywords,
            preview_chars,
            log_file,
            poll_interval,
        })
    }

    /// Recipient, or an error naming the variable to set.
    pub fn require_recipient(&self) -> Result<&str, ConfigError> {
        self.recipient
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("RECIPIENT_EMAIL".into()))
    }
}

/// Parse a poll interval in seconds; `0` disables polling.
pub fn parse_interval(raw: &str) -> Result<Option<Duration>, ConfigError> {
    let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: "POLL_INTERVAL_SECS".into(),
        message: format!("{raw:?}: {e}"),
    })?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DigestConfig::default();
        assert!(config.recipient.is_none());
        assert!(config.keywords.is_empty());
        assert_eq!(config.preview_chars, 500);
        assert_eq!(config.log_file, PathBuf::from("arxiv_filter.log"));
        assert!(config.poll_interval.is_none());
    }

    #[test]
    fn require_recipient_missing() {
        let err = DigestConfig::default().require_recipient().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "RECIPIENT_EMAIL"));
    }

    #[test]
    fn require_recipient_present() {
        let config = DigestConfig {
            recipient: Some("me@test.com".into()),
            ..DigestConfig::default()
        };
        assert_eq!(config.require_recipient().unwrap(), "me@test.com");
    }

    #[test]
    fn interval_parsing() {
        assert_eq!(parse_interval("3600").unwrap(), Some(Duration::from_secs(3600)));
        assert_eq!(parse_interval(" 0 ").unwrap(), None);
        assert!(matches!(
            parse_interval("hourly"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
