//! External process execution.
//!
//! The scheduler client and the result converter both go through
//! [`run_command`]: spawn a rendered [`CommandTemplate`], drain stdout and
//! stderr concurrently, wait with an optional deadline, and kill the child on
//! timeout or when the caller is dropped.

mod error;
mod runner;
mod template;

pub(crate) use error::describe_exit;
pub use error::{ProcessError, TemplateError};
pub use runner::{run_command, CapturedOutput, ProcessOutput, MAX_CAPTURED_BYTES};
pub use template::{render_text, CommandTemplate, RenderedCommand, TemplateVars, PLACEHOLDERS};
