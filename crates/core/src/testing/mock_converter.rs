//! Mock converter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{ConversionJob, ConversionResult, ConverterError, ResultConverter};

const DEFAULT_OUTPUT: &[u8] = br#"{"entities":[]}"#;

/// Mock implementation of the ResultConverter trait.
///
/// Like the real converter, fails with [`ConverterError::InputNotFound`] when
/// the raw output is missing.
#[derive(Debug)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<ConversionJob>>>,
    /// Bytes written to the job's output; `None` simulates a converter that
    /// exits cleanly without producing anything.
    output: Arc<RwLock<Option<Vec<u8>>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Simulated conversion duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            output: Arc::new(RwLock::new(Some(DEFAULT_OUTPUT.to_vec()))),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<ConversionJob> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Set the bytes written as converted output.
    pub async fn set_output(&self, bytes: Vec<u8>) {
        *self.output.write().await = Some(bytes);
    }

    /// Make conversions succeed without writing any output.
    pub async fn set_no_output(&self) {
        *self.output.write().await = None;
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated conversion duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl ResultConverter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, job: &ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.conversions.write().await.push(job.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if !tokio::fs::try_exists(&job.input).await.unwrap_or(false) {
            return Err(ConverterError::InputNotFound {
                path: job.input.clone(),
            });
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(bytes) = self.output.read().await.clone() {
            tokio::fs::write(&job.output, bytes)
                .await
                .map_err(|e| ConverterError::Launch {
                    reason: format!("mock failed to write output: {}", e),
                })?;
        }

        Ok(ConversionResult {
            run_id: job.run_id.clone(),
            output: job.output.clone(),
            stderr: String::new(),
            duration: delay,
        })
    }
}
