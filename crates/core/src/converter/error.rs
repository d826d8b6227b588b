//! Error types for the converter module.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::process::{describe_exit, ProcessError, TemplateError};

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The raw output to convert does not exist.
    #[error("Converter input not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The converter could not be started.
    #[error("Failed to launch converter: {reason}")]
    Launch { reason: String },

    /// The converter was started but could no longer be waited on.
    #[error("Lost track of converter: {reason}")]
    Wait { reason: String },

    /// The converter exited unsuccessfully.
    #[error("Conversion failed with {}", describe_exit(*exit_code))]
    Failed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Conversion timed out.
    #[error("Conversion did not finish within {timeout:?}")]
    Timeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
}

impl ConverterError {
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Failed { stdout, .. } | Self::Timeout { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

impl From<TemplateError> for ConverterError {
    fn from(e: TemplateError) -> Self {
        Self::Launch {
            reason: e.to_string(),
        }
    }
}

impl From<ProcessError> for ConverterError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::Timeout {
                timeout, output, ..
            } => Self::Timeout {
                timeout,
                stdout: output.stdout,
                stderr: output.stderr,
            },
            io @ ProcessError::Io { .. } => Self::Wait {
                reason: io.to_string(),
            },
            launch @ ProcessError::Launch { .. } => Self::Launch {
                reason: launch.to_string(),
            },
        }
    }
}
