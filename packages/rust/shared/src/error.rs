//! Error types for trendbrief.
//!
//! Library crates use [`TrendbriefError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all trendbrief operations.
#[derive(Debug, thiserror::Error)]
pub enum TrendbriefError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a research source or the LLM.
    #[error("network error: {0}")]
    Network(String),

    /// Parse error for an input the caller expected to be well formed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// LLM synthesis error (API failure or unusable response).
    #[error("llm error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Mailbox access error.
    #[error("mailbox error: {0}")]
    Mailbox(String),

    /// Notification delivery error.
    #[error("notify error: {0}")]
    Notify(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TrendbriefError>;

impl TrendbriefError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
