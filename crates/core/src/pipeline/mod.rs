//! The annotation pipeline.
//!
//! One run takes an inbound document through
//! `RECEIVED → STAGED → JOB_SUBMITTED → JOB_DONE → CONVERTED → COMPLETE`:
//! stage it to disk, submit it to the scheduler, convert the job's raw output,
//! and read the converted JSON back. Any failing stage moves the run to
//! `FAILED` and aborts the remaining ones.

mod error;
mod orchestrator;
mod types;

pub use error::PipelineError;
pub use orchestrator::AnnotationPipeline;
pub use types::{ActiveRun, PipelineOutput, PipelineStatus, RunState, Stage, StageTimings};
