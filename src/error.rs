//! Error taxonomy for the ingestion pipeline.
//!
//! Fetch errors are absorbed by the poller that hit them; only configuration
//! errors ever reach the caller of [`crate::pipeline::run`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),
    #[error("undecodable response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::UnexpectedStatus(_) => "status",
            FetchError::Decode(_) => "decode",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("worker count must be at least 1")]
    ZeroWorkers,
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("top_k must be at least 1")]
    ZeroTopK,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
    #[error("cancelled while waiting on the queue")]
    Cancelled,
}
