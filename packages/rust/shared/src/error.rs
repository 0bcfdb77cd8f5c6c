//! Error types for the company enricher.
//!
//! Library crates use [`EnricherError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enricher operations.
#[derive(Debug, thiserror::Error)]
pub enum EnricherError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The database could not be opened or connected to.
    #[error("connection error: {0}")]
    Connection(String),

    /// A read query failed (malformed SQL, missing table or column).
    #[error("query error: {0}")]
    Query(String),

    /// Network failure or non-2xx status from the profile API.
    #[error("transport error: {0}")]
    Transport(String),

    /// The profile API returned a body that does not match the response schema.
    #[error("decode error: {0}")]
    Decode(String),

    /// An insert violated a uniqueness constraint.
    #[error("constraint error for company {company_id}: {message}")]
    Constraint { company_id: i64, message: String },

    /// Any other failure while writing to the sink (including commit).
    #[error("write error: {0}")]
    Write(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnricherError>;

impl EnricherError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a constraint error for the given company.
    pub fn constraint(company_id: i64, msg: impl Into<String>) -> Self {
        Self::Constraint {
            company_id,
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

    /// Whether a failure while enriching one row should only skip that row.
    pub fn is_row_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }

    /// Whether this is a sink-side failure subject to the write-failure policy.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::Constraint { .. } | Self::Write(_))
    }
}
