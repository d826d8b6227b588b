//! Error types for the artifact module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while staging a document.
#[derive(Debug, Error)]
pub enum StagingError {
    /// Writing to the run directory failed (disk full, permission denied).
    #[error("Failed to write staged artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The inbound stream failed mid-read.
    #[error("Document stream failed: {0}")]
    Stream(#[source] std::io::Error),

    /// The document exceeds the configured size limit.
    #[error("Document exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },
}

/// Errors that can occur while reading a converted artifact.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The converted artifact does not exist.
    #[error("Converted artifact not found: {path}")]
    NotFound { path: PathBuf },

    /// The converted artifact exists but could not be read.
    #[error("Failed to read converted artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
