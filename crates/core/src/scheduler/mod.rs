//! Submission of annotation jobs to the cluster job scheduler.
//!
//! The scheduler is a black box: a command is launched with the staged
//! document's location and blocks until the job reaches a terminal state. The
//! job is expected to leave its raw output at the descriptor's `raw_output`
//! path.

mod command;
mod error;
mod traits;
mod types;

pub use command::CommandScheduler;
pub use error::SchedulerError;
pub use traits::JobScheduler;
pub use types::{JobDescriptor, JobRun};
