//! Types for the converter module.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// A single conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionJob {
    pub run_id: String,
    /// Raw scheduler output.
    pub input: PathBuf,
    /// Where the converted artifact should be written.
    pub output: PathBuf,
    pub run_dir: PathBuf,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub run_id: String,
    pub output: PathBuf,
    pub stderr: String,
    pub duration: Duration,
}
