//! arxiv-digest: keyword-filtered arXiv digests by email.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
