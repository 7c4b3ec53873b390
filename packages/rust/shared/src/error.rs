//! Error types for scriptorium.
//!
//! Library crates use [`ScriptoriumError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all scriptorium operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptoriumError {
    /// A document, index member, or referenced fragment does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Malformed front matter or markup.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Required external configuration is absent (e.g. sink credentials).
    #[error("configuration missing: {message}")]
    ConfigurationMissing { message: String },

    /// Nothing survived processing.
    #[error("empty result: {message}")]
    EmptyResult { message: String },

    /// Configuration file could not be read or parsed.
    #[error("config error: {message}")]
    Config { message: String },

    /// Zip container could not be opened or read.
    #[error("archive error: {0}")]
    Archive(String),

    /// Database or record sink error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScriptoriumError>;

impl ScriptoriumError {
    /// Create a not-found error naming the missing item.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a configuration-missing error.
    pub fn configuration_missing(msg: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            message: msg.into(),
        }
    }

    /// Create an empty-result error.
    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::EmptyResult {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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
