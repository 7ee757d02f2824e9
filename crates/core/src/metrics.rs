//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (submissions, terminal outcomes)
//! - Units and stages (outcomes, durations, retries)
//! - Narration cache (hits, misses, errors)
//! - Progress propagation (published events)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs accepted by `submit`.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lectern_jobs_submitted_total", "Total jobs submitted"),
        &["mode"], // "slide_deck", "paginated_document", "long_form_chunked"
    )
    .unwrap()
});

/// Jobs that reached a terminal status.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lectern_jobs_finished_total", "Total jobs finished"),
        &["status"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Jobs currently pending or processing.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("lectern_jobs_active", "Jobs not yet in a terminal status").unwrap()
});

/// Submissions rejected before a job was created.
pub static JOBS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lectern_jobs_rejected_total", "Total rejected submissions"),
        &["reason"], // "invalid_request", "too_many_jobs"
    )
    .unwrap()
});

/// Wall time from dispatch to terminal status.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("lectern_job_duration_seconds", "Duration of jobs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Unit Metrics
// =============================================================================

/// Units processed by outcome.
pub static UNITS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("lectern_units_processed_total", "Total units processed"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Duration of a single stage, retries included.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("lectern_stage_duration_seconds", "Duration of unit stages")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["stage", "result"],
    )
    .unwrap()
});

/// Retry attempts by operation.
pub static COLLABORATOR_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lectern_collaborator_retries_total",
            "Total collaborator retry attempts",
        ),
        &["operation"], // "narration", "quiz", "render", "assembly"
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

pub static NARRATION_CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("lectern_narration_cache_hits_total", "Narration cache hits").unwrap()
});

pub static NARRATION_CACHE_MISSES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lectern_narration_cache_misses_total",
        "Narration cache misses",
    )
    .unwrap()
});

/// Backend failures, all degraded to misses or skipped writes.
pub static NARRATION_CACHE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lectern_narration_cache_errors_total",
            "Narration cache backend errors",
        ),
        &["operation"], // "get", "put"
    )
    .unwrap()
});

// =============================================================================
// Progress Metrics
// =============================================================================

/// Progress events handed to the broadcaster.
pub static PROGRESS_EVENTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lectern_progress_events_total",
            "Total progress events published",
        ),
        &["kind"], // "progress", "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Push subscribers that fell behind and were resynced from a snapshot.
pub static PROGRESS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lectern_progress_lag_events_total",
        "Push subscribers resynced after lagging",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        Box::new(JOBS_REJECTED.clone()),
        Box::new(JOB_DURATION.clone()),
        // Units
        Box::new(UNITS_PROCESSED.clone()),
        Box::new(STAGE_DURATION.clone()),
        Box::new(COLLABORATOR_RETRIES.clone()),
        // Cache
        Box::new(NARRATION_CACHE_HITS.clone()),
        Box::new(NARRATION_CACHE_MISSES.clone()),
        Box::new(NARRATION_CACHE_ERRORS.clone()),
        // Progress
        Box::new(PROGRESS_EVENTS.clone()),
        Box::new(PROGRESS_LAG_EVENTS.clone()),
    ]
}
