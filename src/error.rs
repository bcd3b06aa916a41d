//! Error types for arxiv-digest.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail source / sink errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to fetch: {reason}")]
    FetchFailed { name: String, reason: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Authentication failed for channel {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pipeline-related errors.
///
/// Extraction and filtering never fail; only the collaborators at either
/// end of a run can.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Mail source failed: {0}")]
    Source(#[source] ChannelError),

    #[error("Mail sink failed: {0}")]
    Sink(#[source] ChannelError),
}

/// A paper record that would break its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid arXiv identifier: {0:?}")]
    InvalidId(String),

    #[error("Paper {field} is empty")]
    EmptyField { field: &'static str },
}
