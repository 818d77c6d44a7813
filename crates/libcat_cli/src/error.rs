//! CLI error type.

use libcat_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading or writing a catalog file failed.
    #[error("I/O error on {}: {source}", path.display())]
    File {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading requests or writing responses failed.
    #[error("stream I/O error: {0}")]
    Stream(#[from] std::io::Error),

    /// A catalog file is not valid JSON for the expected layout.
    #[error("invalid catalog file {}: {source}", path.display())]
    Format {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Output could not be serialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Engine error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid command-line usage.
    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
