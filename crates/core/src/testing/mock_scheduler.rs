//! Mock scheduler for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::process::CapturedOutput;
use crate::scheduler::{JobDescriptor, JobRun, JobScheduler, SchedulerError};

const DEFAULT_RAW_OUTPUT: &[u8] = b"<?xml version=\"1.0\"?><annotations/>";

/// Mock implementation of the JobScheduler trait.
///
/// Records every submission and writes a configurable raw output file, so the
/// converter stage has something to read.
#[derive(Debug)]
pub struct MockScheduler {
    /// Recorded submissions.
    submissions: Arc<RwLock<Vec<JobDescriptor>>>,
    /// Bytes written to the descriptor's raw output; `None` writes nothing.
    raw_output: Arc<RwLock<Option<Vec<u8>>>>,
    /// If set, the next submission will fail with this error.
    next_error: Arc<RwLock<Option<SchedulerError>>>,
    /// Simulated job duration.
    delay: Arc<RwLock<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScheduler {
    /// Create a new mock scheduler.
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(Vec::new())),
            raw_output: Arc::new(RwLock::new(Some(DEFAULT_RAW_OUTPUT.to_vec()))),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Get all recorded submissions.
    pub async fn recorded_submissions(&self) -> Vec<JobDescriptor> {
        self.submissions.read().await.clone()
    }

    /// Get the number of submissions.
    pub async fn submission_count(&self) -> usize {
        self.submissions.read().await.len()
    }

    /// Set the raw output written by each job.
    pub async fn set_raw_output(&self, bytes: Vec<u8>) {
        *self.raw_output.write().await = Some(bytes);
    }

    /// Make jobs succeed without writing any raw output.
    pub async fn set_no_raw_output(&self) {
        *self.raw_output.write().await = None;
    }

    /// Configure the next submission to fail with the given error.
    pub async fn set_next_error(&self, error: SchedulerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated job duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Highest number of jobs that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobScheduler for MockScheduler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, descriptor: &JobDescriptor) -> Result<JobRun, SchedulerError> {
        self.submissions.write().await.push(descriptor.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let raw_output = self.raw_output.read().await.clone();
        let written = match raw_output {
            Some(bytes) => tokio::fs::write(&descriptor.raw_output, bytes)
                .await
                .map_err(|e| SchedulerError::Launch {
                    reason: format!("mock failed to write raw output: {}", e),
                }),
            None => Ok(()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        written?;

        Ok(JobRun {
            run_id: descriptor.run_id.clone(),
            raw_output: descriptor.raw_output.clone(),
            exit_code: Some(0),
            output: CapturedOutput::default(),
            duration: delay,
        })
    }
}
