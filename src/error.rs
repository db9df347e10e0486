//! Error types for the investigation pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the investigation pipeline
///
/// Only a subset of these variants ever escapes a run: planning and evidence
/// failures are fatal, worker failures degrade to sentinel findings inside
/// the executor, and sink failures are logged and swallowed.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the OpenRouter API
    #[error("OpenRouter API error: {0}")]
    OpenRouter(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Planning stage failure - fatal, no plan means no worker dispatch
    #[error("Planning failed: {0}")]
    Planning(String),

    /// Single worker slot failure - isolated to a sentinel finding
    #[error("Worker slot {slot} failed: {message}")]
    Worker {
        /// Slot whose worker failed, 1-based
        slot: usize,
        /// Underlying failure description
        message: String,
    },

    /// Evidence source failure - fatal, nothing to analyze
    #[error("Evidence read error: {0}")]
    Evidence(String),

    /// Training example sink failure - logged and swallowed by callers
    #[error("Example sink error: {0}")]
    Sink(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an OpenRouter error
    pub fn openrouter(msg: impl Into<String>) -> Self {
        Self::OpenRouter(msg.into())
    }

    /// Create a planning error
    pub fn planning(msg: impl Into<String>) -> Self {
        Self::Planning(msg.into())
    }

    /// Create a worker error for a specific slot
    pub fn worker(slot: usize, message: impl Into<String>) -> Self {
        Self::Worker {
            slot,
            message: message.into(),
        }
    }

    /// Create an evidence error
    pub fn evidence(msg: impl Into<String>) -> Self {
        Self::Evidence(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
