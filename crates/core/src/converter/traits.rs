//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionResult};

/// A converter that turns raw job output into the response artifact.
#[async_trait]
pub trait ResultConverter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts `job.input` into `job.output`.
    ///
    /// Fails with [`ConverterError::InputNotFound`] before launching anything
    /// if the input is missing. Success means the converter exited cleanly; it
    /// does not guarantee that the output file exists.
    async fn convert(&self, job: &ConversionJob) -> Result<ConversionResult, ConverterError>;
}
