//! Error types for the curation pipeline.
//!
//! Library crates use [`CurationError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all curation operations.
#[derive(Debug, thiserror::Error)]
pub enum CurationError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A required input (file, directory, data key) is absent.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Network/HTTP error while fetching a feed, page, or transcript.
    #[error("network error: {0}")]
    Network(String),

    /// XML, HTML, or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A region sentinel marker is missing from the host document.
    #[error("region marker not found in document: {marker}")]
    RegionNotFound { marker: String },

    /// LLM summarization error (request, API, or response parsing).
    #[error("summarize error: {0}")]
    Summarize(String),

    /// Version-control publishing error.
    #[error("publish error: {0}")]
    Publish(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Fetched or loaded content failed validation (too short, malformed, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CurationError>;

impl CurationError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a not-found error naming the missing input.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a region-not-found error for the given marker.
    pub fn region_not_found(marker: impl Into<String>) -> Self {
        Self::RegionNotFound {
            marker: marker.into(),
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

    /// Whether this error aborts the run rather than degrading one source.
    ///
    /// Fetch-side failures (network, parse, validation, summarize) are caught at
    /// the collaborator boundary; everything else is structural.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Network(_) | Self::Parse { .. } | Self::Validation { .. } | Self::Summarize(_)
        )
    }
}
