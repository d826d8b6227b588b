//! Error types for the process module.

use std::time::Duration;
use thiserror::Error;

use super::runner::CapturedOutput;

/// Errors from rendering a [`super::CommandTemplate`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template references a placeholder that has no value for this run.
    #[error("Placeholder {{{name}}} has no value (is its tool location configured?)")]
    Unresolved { name: String },

    /// The template references a placeholder that does not exist.
    #[error("Unknown placeholder {{{name}}}")]
    Unknown { name: String },
}

/// Human-readable exit status, "exit code N" or "a signal".
pub(crate) fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// Errors from running an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The deadline elapsed; the process has been killed and reaped.
    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout {
        program: String,
        timeout: Duration,
        pid: Option<u32>,
        output: CapturedOutput,
    },

    /// Waiting on the process failed.
    #[error("I/O error while waiting for '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Output captured before the failure, if any.
    pub fn captured(&self) -> Option<&CapturedOutput> {
        match self {
            Self::Timeout { output, .. } => Some(output),
            _ => None,
        }
    }
}
