//! Conversion of a job's raw output into the response format.
//!
//! The converter is an external program (by default the cTAKES content
//! handler) that reads the scheduler's raw XML and writes JSON at a path the
//! pipeline chooses.

mod command;
mod error;
mod traits;
mod types;

pub use command::CommandConverter;
pub use error::ConverterError;
pub use traits::ResultConverter;
pub use types::{ConversionJob, ConversionResult};
