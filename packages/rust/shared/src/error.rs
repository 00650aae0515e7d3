//! Error types for BrandScout.
//!
//! Library crates use [`BrandScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all BrandScout operations.
#[derive(Debug, thiserror::Error)]
pub enum BrandScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error (transport failure, timeout, bad status).
    #[error("network error: {0}")]
    Network(String),

    /// Markup or response body could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Catalog document could not be read, decoded, or written.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Enrichment provider error (search backend, language model, credentials).
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// Logo discovery found nothing usable on the site.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Logo download was rejected or failed mid-stream.
    #[error("download error: {0}")]
    Download(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, empty name, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BrandScoutError>;

impl BrandScoutError {
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
