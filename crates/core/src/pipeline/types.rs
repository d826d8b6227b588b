//! Types for the pipeline module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::artifact::ResultPayload;

/// State of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Received,
    Staged,
    JobSubmitted,
    JobDone,
    Converted,
    Complete,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A step of a run that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Staging,
    Submission,
    Conversion,
    Read,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Staging, Stage::Submission, Stage::Conversion, Stage::Read];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Submission => "submission",
            Self::Conversion => "conversion",
            Self::Read => "read",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Staging => 0,
            Self::Submission => 1,
            Self::Conversion => 2,
            Self::Read => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time spent in each stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub staging_ms: u64,
    pub submission_ms: u64,
    pub conversion_ms: u64,
    pub read_ms: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: String,
    pub payload: ResultPayload,
    pub staged_bytes: u64,
    pub timings: StageTimings,
}

/// A run currently in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRun {
    pub run_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
}

/// Overall pipeline status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Maximum runs executing at once.
    pub max_concurrent_runs: usize,
    /// Runs waiting for a slot.
    pub queued_runs: usize,
    /// Runs holding a slot, oldest first.
    pub active_runs: Vec<ActiveRun>,
    /// Runs completed since startup.
    pub total_completed: u64,
    /// Runs failed since startup.
    pub total_failed: u64,
    /// Runs abandoned because the caller went away.
    pub total_cancelled: u64,
    /// Failures since startup, keyed by stage.
    pub failures_by_stage: BTreeMap<String, u64>,
}
