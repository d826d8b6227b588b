//! Error types for the pipeline module.

use std::time::Duration;
use thiserror::Error;

use super::types::Stage;
use crate::artifact::{ReadError, StagingError};
use crate::converter::ConverterError;
use crate::scheduler::SchedulerError;

/// A failed pipeline run, tagged with the run and the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The document could not be staged.
    #[error("Run {run_id} failed to stage document: {source}")]
    Staging {
        run_id: String,
        #[source]
        source: StagingError,
    },

    /// The scheduler job could not be launched or terminated unsuccessfully.
    #[error("Run {run_id} failed during job submission: {source}")]
    Submission {
        run_id: String,
        #[source]
        source: SchedulerError,
    },

    /// An external process overran its deadline and was killed.
    #[error("Run {run_id} timed out during {stage} after {timeout:?}")]
    Timeout {
        run_id: String,
        stage: Stage,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    /// The converter could not run or failed.
    #[error("Run {run_id} failed during conversion: {source}")]
    Conversion {
        run_id: String,
        #[source]
        source: ConverterError,
    },

    /// The converted artifact could not be read.
    #[error("Run {run_id} failed to read result: {source}")]
    Read {
        run_id: String,
        #[source]
        source: ReadError,
    },
}

impl PipelineError {
    pub(crate) fn staging(run_id: &str, source: StagingError) -> Self {
        Self::Staging {
            run_id: run_id.to_string(),
            source,
        }
    }

    pub(crate) fn submission(run_id: &str, source: SchedulerError) -> Self {
        match source {
            SchedulerError::Timeout {
                timeout,
                stdout,
                stderr,
            } => Self::Timeout {
                run_id: run_id.to_string(),
                stage: Stage::Submission,
                timeout,
                stdout,
                stderr,
            },
            source => Self::Submission {
                run_id: run_id.to_string(),
                source,
            },
        }
    }

    pub(crate) fn conversion(run_id: &str, source: ConverterError) -> Self {
        match source {
            ConverterError::Timeout {
                timeout,
                stdout,
                stderr,
            } => Self::Timeout {
                run_id: run_id.to_string(),
                stage: Stage::Conversion,
                timeout,
                stdout,
                stderr,
            },
            source => Self::Conversion {
                run_id: run_id.to_string(),
                source,
            },
        }
    }

    pub(crate) fn read(run_id: &str, source: ReadError) -> Self {
        Self::Read {
            run_id: run_id.to_string(),
            source,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            Self::Staging { run_id, .. }
            | Self::Submission { run_id, .. }
            | Self::Timeout { run_id, .. }
            | Self::Conversion { run_id, .. }
            | Self::Read { run_id, .. } => run_id,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Staging { .. } => Stage::Staging,
            Self::Submission { .. } => Stage::Submission,
            Self::Timeout { stage, .. } => *stage,
            Self::Conversion { .. } => Stage::Conversion,
            Self::Read { .. } => Stage::Read,
        }
    }

    /// Short machine-readable failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Staging {
                source: StagingError::TooLarge { .. },
                ..
            } => "too_large",
            Self::Staging { .. } => "staging",
            Self::Submission { .. } => "submission",
            Self::Timeout { .. } => "timeout",
            Self::Conversion { .. } => "conversion",
            Self::Read { .. } => "read",
        }
    }

    pub fn is_too_large(&self) -> bool {
        matches!(
            self,
            Self::Staging {
                source: StagingError::TooLarge { .. },
                ..
            }
        )
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Submission { source, .. } => source.exit_code(),
            Self::Conversion { source, .. } => source.exit_code(),
            _ => None,
        }
    }

    /// Captured stdout of the failing process, if one ran.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Submission { source, .. } => source.stdout(),
            Self::Conversion { source, .. } => source.stdout(),
            Self::Timeout { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    /// Captured stderr of the failing process, if one ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Submission { source, .. } => source.stderr(),
            Self::Conversion { source, .. } => source.stderr(),
            Self::Timeout { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
