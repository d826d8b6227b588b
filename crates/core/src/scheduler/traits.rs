//! Trait definitions for the scheduler module.

use async_trait::async_trait;

use super::error::SchedulerError;
use super::types::{JobDescriptor, JobRun};

/// A cluster scheduler that runs one annotation job to completion.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Returns the name of this scheduler implementation.
    fn name(&self) -> &str;

    /// Submits the job and waits for it to finish.
    ///
    /// Returns once the job has terminated. A job that terminates
    /// unsuccessfully or overruns its deadline yields an error carrying the
    /// captured output.
    async fn submit(&self, descriptor: &JobDescriptor) -> Result<JobRun, SchedulerError>;
}
