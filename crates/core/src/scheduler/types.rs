//! Types for the scheduler module.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::process::CapturedOutput;

/// What gets submitted for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    pub run_id: String,
    pub job_template: PathBuf,
    /// Staged input document.
    pub input: PathBuf,
    /// Where the job is expected to write its raw output.
    pub raw_output: PathBuf,
    pub run_dir: PathBuf,
}

/// A job that completed successfully.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub run_id: String,
    pub raw_output: PathBuf,
    pub exit_code: Option<i32>,
    pub output: CapturedOutput,
    pub duration: Duration,
}
