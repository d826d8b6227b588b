//! Pipeline orchestrator implementation.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::error::PipelineError;
use super::types::{ActiveRun, PipelineOutput, PipelineStatus, RunState, Stage, StageTimings};
use crate::artifact::{new_run_id, read_result, ArtifactStager, Document, RunArtifacts};
use crate::config::{CleanupPolicy, Config, PipelineConfig};
use crate::converter::{CommandConverter, ConversionJob, ResultConverter};
use crate::metrics::{PIPELINE_RUNS_TOTAL, PIPELINE_STAGE_DURATION, PIPELINE_STAGE_FAILURES};
use crate::scheduler::{CommandScheduler, JobDescriptor, JobScheduler};

/// Cumulative run counters.
#[derive(Default)]
struct RunStats {
    queued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    failures_by_stage: [AtomicU64; 4],
}

type ActiveRuns = Arc<RwLock<HashMap<String, ActiveRun>>>;

/// Runs documents through stage, submit, convert and read.
pub struct AnnotationPipeline {
    config: PipelineConfig,
    scheduler: Arc<dyn JobScheduler>,
    converter: Arc<dyn ResultConverter>,
    stager: ArtifactStager,
    semaphore: Arc<Semaphore>,
    stats: Arc<RunStats>,
    active_runs: ActiveRuns,
}

impl AnnotationPipeline {
    /// Creates a pipeline around the given scheduler and converter.
    pub fn new(
        config: PipelineConfig,
        scheduler: Arc<dyn JobScheduler>,
        converter: Arc<dyn ResultConverter>,
    ) -> Self {
        let permits = config.max_concurrent_runs.min(Semaphore::MAX_PERMITS);
        let semaphore = Arc::new(Semaphore::new(permits));

        Self {
            config,
            scheduler,
            converter,
            stager: ArtifactStager::new(u64::MAX),
            semaphore,
            stats: Arc::new(RunStats::default()),
            active_runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a pipeline that runs the configured external commands.
    pub fn from_config(config: &Config) -> Self {
        let scheduler = Arc::new(CommandScheduler::from_pipeline_config(&config.pipeline));
        let converter = Arc::new(CommandConverter::from_pipeline_config(&config.pipeline));
        Self::new(config.pipeline.clone(), scheduler, converter)
            .with_max_document_bytes(config.server.max_document_bytes)
    }

    /// Rejects documents larger than `limit` bytes during staging.
    pub fn with_max_document_bytes(mut self, limit: u64) -> Self {
        self.stager = ArtifactStager::new(limit);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the current pipeline status.
    pub fn status(&self) -> PipelineStatus {
        let mut active_runs: Vec<ActiveRun> =
            read_runs(&self.active_runs).values().cloned().collect();
        active_runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));

        let failures_by_stage = Stage::ALL
            .iter()
            .map(|stage| {
                (
                    stage.as_str().to_string(),
                    self.stats.failures_by_stage[stage.index()].load(Ordering::Relaxed),
                )
            })
            .collect();

        PipelineStatus {
            max_concurrent_runs: self.config.max_concurrent_runs,
            queued_runs: self.stats.queued.load(Ordering::Relaxed) as usize,
            active_runs,
            total_completed: self.stats.completed.load(Ordering::Relaxed),
            total_failed: self.stats.failed.load(Ordering::Relaxed),
            total_cancelled: self.stats.cancelled.load(Ordering::Relaxed),
            failures_by_stage,
        }
    }

    /// Runs one document through the whole pipeline.
    ///
    /// Waits for a free slot when `max_concurrent_runs` runs are already in
    /// flight. Dropping the returned future abandons the run; external
    /// processes it started are killed.
    pub async fn run(&self, document: Document) -> Result<PipelineOutput, PipelineError> {
        let run_id = new_run_id();
        let artifacts = RunArtifacts::new(
            &self.config.buffer_dir,
            &run_id,
            &self.config.raw_output_suffix,
        );

        let _permit = {
            let _queued = QueuedGuard::new(&self.stats);
            // The semaphore is never closed.
            self.semaphore.acquire().await.ok()
        };

        let tracker = RunTracker::start(
            artifacts,
            Arc::clone(&self.active_runs),
            Arc::clone(&self.stats),
            self.config.cleanup,
        );
        info!(run_id = %run_id, "Pipeline run started");

        let result = self.execute(&tracker, document).await;

        match &result {
            Ok(output) => {
                tracker.transition(RunState::Complete);
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
                PIPELINE_RUNS_TOTAL.with_label_values(&["success"]).inc();
                info!(
                    run_id = %run_id,
                    staged_bytes = output.staged_bytes,
                    response_bytes = output.payload.bytes.len(),
                    "Pipeline run complete"
                );
            }
            Err(e) => {
                tracker.transition(RunState::Failed);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.stats.failures_by_stage[e.stage().index()].fetch_add(1, Ordering::Relaxed);
                PIPELINE_RUNS_TOTAL.with_label_values(&["failed"]).inc();
                PIPELINE_STAGE_FAILURES
                    .with_label_values(&[e.stage().as_str(), e.kind()])
                    .inc();
                warn!(
                    run_id = %run_id,
                    stage = %e.stage(),
                    kind = e.kind(),
                    error = %e,
                    "Pipeline run failed"
                );
            }
        }

        tracker.finish(result.is_ok()).await;
        result
    }

    async fn execute(
        &self,
        tracker: &RunTracker,
        document: Document,
    ) -> Result<PipelineOutput, PipelineError> {
        let artifacts = tracker.artifacts.clone();
        let run_id = artifacts.run_id.as_str();
        let mut timings = StageTimings::default();

        // RECEIVED -> STAGED
        let started = Instant::now();
        let staged = self
            .stager
            .stage(&artifacts, document.stream)
            .await
            .map_err(|e| PipelineError::staging(run_id, e));
        timings.staging_ms = observe(Stage::Staging, started);
        let staged = staged?;
        tracker.transition(RunState::Staged);

        // STAGED -> JOB_SUBMITTED -> JOB_DONE
        let descriptor = JobDescriptor {
            run_id: run_id.to_string(),
            job_template: self.config.job_template.clone(),
            input: staged.path.clone(),
            raw_output: artifacts.raw_output.clone(),
            run_dir: artifacts.run_dir.clone(),
        };
        tracker.transition(RunState::JobSubmitted);
        let started = Instant::now();
        let job = self
            .scheduler
            .submit(&descriptor)
            .await
            .map_err(|e| PipelineError::submission(run_id, e));
        timings.submission_ms = observe(Stage::Submission, started);
        let job = job?;
        tracker.transition(RunState::JobDone);

        // JOB_DONE -> CONVERTED
        let conversion = ConversionJob {
            run_id: run_id.to_string(),
            input: job.raw_output,
            output: artifacts.converted.clone(),
            run_dir: artifacts.run_dir.clone(),
        };
        let started = Instant::now();
        let converted = self
            .converter
            .convert(&conversion)
            .await
            .map_err(|e| PipelineError::conversion(run_id, e));
        timings.conversion_ms = observe(Stage::Conversion, started);
        let converted = converted?;
        tracker.transition(RunState::Converted);

        // CONVERTED -> (read) -> COMPLETE
        let started = Instant::now();
        let payload = read_result(&converted.output)
            .await
            .map_err(|e| PipelineError::read(run_id, e));
        timings.read_ms = observe(Stage::Read, started);

        Ok(PipelineOutput {
            run_id: run_id.to_string(),
            payload: payload?,
            staged_bytes: staged.size_bytes,
            timings,
        })
    }
}

fn observe(stage: Stage, started: Instant) -> u64 {
    let elapsed = started.elapsed();
    PIPELINE_STAGE_DURATION
        .with_label_values(&[stage.as_str()])
        .observe(elapsed.as_secs_f64());
    elapsed.as_millis() as u64
}

fn read_runs(
    runs: &RwLock<HashMap<String, ActiveRun>>,
) -> std::sync::RwLockReadGuard<'_, HashMap<String, ActiveRun>> {
    runs.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_runs(
    runs: &RwLock<HashMap<String, ActiveRun>>,
) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ActiveRun>> {
    runs.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counts a run as queued until it gets a slot or is dropped.
struct QueuedGuard<'a> {
    stats: &'a RunStats,
}

impl<'a> QueuedGuard<'a> {
    fn new(stats: &'a RunStats) -> Self {
        stats.queued.fetch_add(1, Ordering::Relaxed);
        Self { stats }
    }
}

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        self.stats.queued.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Tracks a run in the active set and applies the cleanup policy.
///
/// If the run is dropped before [`RunTracker::finish`], it is counted as
/// cancelled and its directory is handled like a failed run's.
struct RunTracker {
    artifacts: RunArtifacts,
    active_runs: ActiveRuns,
    stats: Arc<RunStats>,
    cleanup: CleanupPolicy,
    finished: bool,
}

impl RunTracker {
    fn start(
        artifacts: RunArtifacts,
        active_runs: ActiveRuns,
        stats: Arc<RunStats>,
        cleanup: CleanupPolicy,
    ) -> Self {
        write_runs(&active_runs).insert(
            artifacts.run_id.clone(),
            ActiveRun {
                run_id: artifacts.run_id.clone(),
                state: RunState::Received,
                started_at: Utc::now(),
            },
        );

        Self {
            artifacts,
            active_runs,
            stats,
            cleanup,
            finished: false,
        }
    }

    fn transition(&self, state: RunState) {
        if let Some(run) = write_runs(&self.active_runs).get_mut(&self.artifacts.run_id) {
            run.state = state;
        }
        debug!(run_id = %self.artifacts.run_id, state = ?state, "Run state changed");
    }

    async fn finish(mut self, succeeded: bool) {
        self.finished = true;
        write_runs(&self.active_runs).remove(&self.artifacts.run_id);

        if self.cleanup.should_remove(succeeded) {
            if let Err(e) = self.artifacts.remove().await {
                warn!(
                    run_id = %self.artifacts.run_id,
                    path = %self.artifacts.run_dir.display(),
                    error = %e,
                    "Failed to remove run directory"
                );
            }
        }
    }
}

impl Drop for RunTracker {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        write_runs(&self.active_runs).remove(&self.artifacts.run_id);
        self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
        PIPELINE_RUNS_TOTAL.with_label_values(&["cancelled"]).inc();
        warn!(run_id = %self.artifacts.run_id, "Pipeline run cancelled");

        if self.cleanup.should_remove(false) {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let artifacts = self.artifacts.clone();
                handle.spawn(async move {
                    // Give killed children a moment to release their files.
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let _ = artifacts.remove().await;
                });
            }
        }
    }
}
