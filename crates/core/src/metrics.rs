//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Annotation pipeline (runs, per-stage durations and failures)
//! - External processes (scheduler, converter)
//! - Upstream HTTP services (extraction proxy)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Pipeline runs total by result.
pub static PIPELINE_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docpipe_pipeline_runs_total", "Total annotation pipeline runs"),
        &["result"], // "success", "failed", "cancelled"
    )
    .unwrap()
});

/// Duration of each pipeline stage in seconds.
pub static PIPELINE_STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docpipe_pipeline_stage_duration_seconds",
            "Duration of annotation pipeline stages",
        )
        .buckets(vec![
            0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 1000.0,
        ]),
        &["stage"], // "staging", "submission", "conversion", "read"
    )
    .unwrap()
});

/// Pipeline stage failures.
pub static PIPELINE_STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docpipe_pipeline_stage_failures_total",
            "Annotation pipeline stage failures",
        ),
        &["stage", "kind"],
    )
    .unwrap()
});

// =============================================================================
// External Process Metrics
// =============================================================================

/// External process invocations by outcome.
pub static EXTERNAL_PROCESS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docpipe_external_process_total",
            "External process invocations",
        ),
        &["tool", "status"], // status: "success", "failed", "timeout", "launch_failed", "error"
    )
    .unwrap()
});

// =============================================================================
// Upstream Service Metrics
// =============================================================================

/// Upstream requests total.
pub static UPSTREAM_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docpipe_upstream_requests_total",
            "Total upstream service requests",
        ),
        &["service", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Upstream request duration.
pub static UPSTREAM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docpipe_upstream_duration_seconds",
            "Duration of upstream service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 120.0]),
        &["service"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pipeline
        Box::new(PIPELINE_RUNS_TOTAL.clone()),
        Box::new(PIPELINE_STAGE_DURATION.clone()),
        Box::new(PIPELINE_STAGE_FAILURES.clone()),
        // External processes
        Box::new(EXTERNAL_PROCESS_TOTAL.clone()),
        // Upstream
        Box::new(UPSTREAM_REQUESTS_TOTAL.clone()),
        Box::new(UPSTREAM_DURATION.clone()),
    ]
}
