//! Error types for the scheduler module.

use std::time::Duration;
use thiserror::Error;

use crate::process::{describe_exit, ProcessError, TemplateError};

/// Errors that can occur while running a scheduler job.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The submission command could not be started.
    #[error("Failed to launch job submission: {reason}")]
    Launch { reason: String },

    /// The submission was started but could no longer be waited on.
    #[error("Lost track of job submission: {reason}")]
    Wait { reason: String },

    /// The job terminated unsuccessfully.
    #[error("Job submission exited with {}", describe_exit(*exit_code))]
    Failed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The job overran its deadline and was killed.
    #[error("Job did not finish within {timeout:?}")]
    Timeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
}

impl SchedulerError {
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Failed { stdout, .. } | Self::Timeout { stdout, .. } => Some(stdout),
            Self::Launch { .. } | Self::Wait { .. } => None,
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            Self::Launch { .. } | Self::Wait { .. } => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

impl From<TemplateError> for SchedulerError {
    fn from(e: TemplateError) -> Self {
        Self::Launch {
            reason: e.to_string(),
        }
    }
}

impl From<ProcessError> for SchedulerError {
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
