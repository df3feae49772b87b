//! Unified error types for pinfwd.

use thiserror::Error;

/// Result type alias using PinfwdError.
pub type Result<T> = std::result::Result<T, PinfwdError>;

#[derive(Error, Debug)]
pub enum PinfwdError {
    // Pinned-source errors — the only kind that aborts a run
    #[error("Source error: {0}")]
    Source(String),

    #[error("Pinned message in chat {0} contains no text")]
    SourceEmpty(i64),

    // Transport errors
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    // Storage errors
    #[error("Store error: {0}")]
    Store(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PinfwdError {
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors that must abort the whole run (spoiled source);
    /// everything else is recovered locally by the forwarder.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Source(_) | Self::SourceEmpty(_))
    }
}
