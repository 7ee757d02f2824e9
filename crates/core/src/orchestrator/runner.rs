//! Job orchestrator implementation.
//!
//! Drives jobs through their state machine:
//! - Dispatch: units in ascending order, bounded by a process-wide slot pool
//! - Processing: each unit runs in its own task via [`UnitProcessor`]
//! - Completion: failure thresholds, then final assembly

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::assembler::{AssemblyPolicy, ClipInput, VideoAssembler};
use crate::benchmark::{BenchmarkHistory, BenchmarkRecord};
use crate::document::{Document, UnitContent};
use crate::job::{
    Job, JobCell, JobRegistry, JobResult, JobStatus, JobSummary, Stage, StagePlan, StageState,
};
use crate::metrics;
use crate::processor::{StageReporter, StageUpdate, UnitJobConfig, UnitProcessor, UnitResult};
use crate::progress::{LocalProgressTransport, ProgressBroadcaster, ProgressEvent};

use super::config::OrchestratorConfig;
use super::types::{JobRequest, OrchestratorError};

/// Serialized access to one job's record.
///
/// Every mutation goes through [`mutate`](Self::mutate), which publishes the
/// resulting snapshot while the job is still live. Mutations after the
/// terminal transition change the record silently.
#[derive(Clone)]
struct JobHandle {
    cell: Arc<JobCell>,
    broadcaster: Arc<ProgressBroadcaster>,
}

impl JobHandle {
    fn mutate<R>(&self, f: impl FnOnce(&mut Job) -> R) -> R {
        self.cell.update(|job| {
            let was_terminal = job.status.is_terminal();
            let before = job.updated_at;
            let result = f(job);

            if !was_terminal && job.updated_at != before {
                if job.status.is_terminal() {
                    record_finished(job);
                }
                // Published under the job lock so events leave in mutation order.
                self.broadcaster
                    .publish(ProgressEvent::from_snapshot(job.clone()));
            }
            result
        })
    }

    fn status(&self) -> JobStatus {
        self.cell.update(|job| job.status)
    }

    /// Moves a live job to Failed with `reason`.
    fn fail(&self, reason: String) {
        let outcome = self.mutate(|job| {
            job.transition(JobStatus::Failed)?;
            job.error = Some(reason.clone());
            job.current_step = "Failed".to_string();
            Ok::<_, crate::job::JobError>(job.id.clone())
        });
        match outcome {
            Ok(job_id) => warn!(job_id = %job_id, reason = %reason, "Job failed"),
            Err(e) => debug!(error = %e, "Job already finished, failure not recorded"),
        }
    }
}

fn record_finished(job: &Job) {
    let status = job.status.as_str();
    metrics::JOBS_FINISHED.with_label_values(&[status]).inc();
    metrics::JOBS_ACTIVE.dec();
    if let Some(elapsed) = job
        .completed_at
        .and_then(|done| (done - job.created_at).to_std().ok())
    {
        metrics::JOB_DURATION
            .with_label_values(&[status])
            .observe(elapsed.as_secs_f64());
    }
}

/// Applies unit sub-state changes to the job record.
struct JobStateReporter {
    handle: JobHandle,
}

#[async_trait]
impl StageReporter for JobStateReporter {
    async fn report(&self, update: StageUpdate) {
        let StageUpdate {
            unit_number,
            stage,
            state,
            error,
        } = update;
        let outcome = self
            .handle
            .mutate(|job| job.update_stage(unit_number, stage, state, error));
        if let Err(e) = outcome {
            warn!(unit = unit_number, stage = %stage, error = %e, "Rejected sub-state update");
        }
    }
}

/// Failed-unit count of one run, checked against `max_failed_units` as
/// each unit finishes.
struct FailureBudget {
    limit: Option<usize>,
    failed: AtomicUsize,
}

impl FailureBudget {
    fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            failed: AtomicUsize::new(0),
        }
    }

    /// Counts one failed unit and fails the job once the limit is exceeded,
    /// which stops further dispatch.
    fn record_failure(&self, handle: &JobHandle) {
        let failed = self.failed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.limit {
            if failed > limit {
                handle.fail(format!(
                    "{failed} units failed, more than the allowed {limit}"
                ));
            }
        }
    }
}

/// Everything one job run needs, moved into its task.
struct JobRun {
    handle: JobHandle,
    units: Vec<UnitContent>,
    unit_config: UnitJobConfig,
    policy: AssemblyPolicy,
    config: OrchestratorConfig,
    processor: Arc<UnitProcessor>,
    assembler: Arc<VideoAssembler>,
    unit_slots: Arc<Semaphore>,
    benchmarks: Arc<BenchmarkHistory>,
}

impl JobRun {
    async fn execute(self) {
        let started = Instant::now();
        let job_id = self.unit_config.job_id.clone();

        let dispatching = self.handle.mutate(|job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            match job.transition(JobStatus::Processing) {
                Ok(()) => {
                    job.set_step("Dispatching units");
                    true
                }
                Err(_) => false,
            }
        });
        if !dispatching {
            info!(job_id = %job_id, "Job left pending before dispatch, not running");
            return;
        }

        if self.unit_config.stages.render {
            if let Err(e) = self.assembler.validate().await {
                self.handle.fail(format!("setup failed: {e}"));
                return;
            }
        }

        info!(job_id = %job_id, units = self.units.len(), "Dispatching units");
        let mut results = self.dispatch().await;
        results.sort_by_key(|r| r.unit_number);

        if self.handle.status().is_terminal() {
            info!(job_id = %job_id, finished_units = results.len(), "Job ended during dispatch, in-flight units drained");
            return;
        }

        self.complete(results, started).await;
    }

    /// Dispatches units in ascending order and waits for all of them.
    async fn dispatch(&self) -> Vec<UnitResult> {
        let mut tasks = JoinSet::new();
        let budget = Arc::new(FailureBudget::new(self.config.max_failed_units));

        for unit in &self.units {
            let permit = match self.unit_slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if self.handle.status().is_terminal() {
                debug!(job_id = %self.unit_config.job_id, unit = unit.unit_number, "Job finished, halting dispatch");
                break;
            }

            let unit = unit.clone();
            let unit_config = self.unit_config.clone();
            let processor = Arc::clone(&self.processor);
            let reporter = JobStateReporter {
                handle: self.handle.clone(),
            };
            let budget = Arc::clone(&budget);
            debug!(job_id = %unit_config.job_id, unit = unit.unit_number, "Unit dispatched");

            tasks.spawn(async move {
                let _permit = permit;
                let unit_number = unit.unit_number;
                let outcome = AssertUnwindSafe(processor.process(&unit, &unit_config, &reporter))
                    .catch_unwind()
                    .await;
                let result = match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        error!(job_id = %unit_config.job_id, unit = unit_number, "Unit task panicked");
                        fail_unresolved(&reporter.handle, unit_number, unit_config.stages);
                        let mut result = UnitResult::new(unit_number);
                        result.failed = true;
                        result.error = Some("unit task panicked".to_string());
                        result
                    }
                };
                if result.failed {
                    budget.record_failure(&reporter.handle);
                }
                result
            });
        }

        let mut results = Vec::with_capacity(self.units.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(job_id = %self.unit_config.job_id, error = %e, "Unit task aborted"),
            }
        }
        results
    }

    async fn complete(self, results: Vec<UnitResult>, started: Instant) {
        let job_id = &self.unit_config.job_id;
        let failed: Vec<u32> = results
            .iter()
            .filter(|r| r.failed)
            .map(|r| r.unit_number)
            .collect();
        let succeeded = results.len() - failed.len();

        if succeeded == 0 && !results.is_empty() && self.config.fail_when_all_units_fail {
            self.handle
                .fail(format!("all {} units failed", results.len()));
            return;
        }

        let mut final_artifact = None;
        if self.unit_config.stages.render && succeeded > 0 {
            self.handle.mutate(|job| job.set_step("Assembling video"));
            let inputs = results
                .iter()
                .map(|r| {
                    let clip = if r.failed { None } else { r.clip_ref.clone() };
                    ClipInput::new(r.unit_number, clip)
                })
                .collect();
            match self.assembler.assemble(inputs, self.policy).await {
                Ok(output) => final_artifact = Some(output.artifact),
                Err(e) => {
                    self.handle.fail(format!("final assembly failed: {e}"));
                    return;
                }
            }
        } else if self.unit_config.stages.render {
            warn!(job_id = %job_id, "No successful units, skipping final assembly");
        }

        let cache_hits = results.iter().filter(|r| r.narration_cached).count() as u32;
        let cache_misses = results.len() as u32 - cache_hits;
        let snapshot = self.handle.cell.snapshot();
        let mut result = JobResult {
            job_id: job_id.clone(),
            status: JobStatus::Completed,
            mode: snapshot.mode,
            language: snapshot.language.clone(),
            units: results,
            final_artifact,
            failed_units: failed,
            cache_hits,
            cache_misses,
            processing_time_ms: started.elapsed().as_millis() as u64,
            created_at: snapshot.created_at,
            completed_at: Utc::now(),
        };

        let model_version = &self.processor.config().model_version;
        let cell = Arc::clone(&self.handle.cell);
        let benchmarks = Arc::clone(&self.benchmarks);
        let outcome = self.handle.mutate(|job| {
            job.set_step("Completed");
            job.transition(JobStatus::Completed)?;
            // Stored under the job lock: the result and its benchmark exist
            // once Completed is visible.
            result.completed_at = job.completed_at.unwrap_or(result.completed_at);
            benchmarks.record(BenchmarkRecord::from_result(&result, model_version));
            cell.set_result(result);
            Ok::<_, crate::job::JobError>(())
        });
        match outcome {
            Ok(()) => info!(
                job_id = %job_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job completed"
            ),
            Err(e) => debug!(job_id = %job_id, error = %e, "Job finished elsewhere before completion"),
        }
    }
}

/// Marks every unresolved required sub-state of a unit as failed.
fn fail_unresolved(handle: &JobHandle, unit_number: u32, stages: StagePlan) {
    handle.mutate(|job| {
        for stage in Stage::ALL {
            let unresolved = job
                .unit(unit_number)
                .is_some_and(|u| stages.is_required(stage) && !u.stage(stage).is_resolved());
            if unresolved {
                if let Err(e) = job.update_stage(
                    unit_number,
                    stage,
                    StageState::Failed,
                    Some(format!("{stage} aborted")),
                ) {
                    debug!(unit = unit_number, stage = %stage, error = %e, "Could not mark sub-state failed");
                }
            }
        }
    });
}

/// The job orchestrator: accepts documents, runs them, and answers for
/// their state.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    processor: Arc<UnitProcessor>,
    assembler: Arc<VideoAssembler>,
    registry: Arc<JobRegistry>,
    broadcaster: Arc<ProgressBroadcaster>,
    benchmarks: Arc<BenchmarkHistory>,
    unit_slots: Arc<Semaphore>,
    admission: Mutex<()>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        processor: Arc<UnitProcessor>,
        broadcaster: Arc<ProgressBroadcaster>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let assembler = Arc::new(VideoAssembler::new(
            Arc::clone(&processor.collaborators().concatenator),
            processor.config().retry.clone(),
            processor.config().stage_timeout(),
        ));

        Self {
            registry: Arc::new(JobRegistry::new(config.job_retention())),
            benchmarks: Arc::new(BenchmarkHistory::new(config.benchmark_history_size)),
            unit_slots: Arc::new(Semaphore::new(config.max_parallel_units.max(1))),
            config,
            processor,
            assembler,
            broadcaster,
            admission: Mutex::new(()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the orchestrator (spawns the eviction loop).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting job orchestrator");
        self.spawn_eviction_loop();
    }

    /// Stop background work. Running jobs are left to finish.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping job orchestrator");
        // Signal shutdown to all workers
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn spawn_eviction_loop(&self) {
        let running = Arc::clone(&self.running);
        let registry = Arc::clone(&self.registry);
        let broadcaster = Arc::clone(&self.broadcaster);
        let interval = self.config.eviction_interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Eviction loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Eviction loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let evicted = registry.evict_expired(Utc::now());
                        for job_id in &evicted {
                            broadcaster.remove(job_id);
                        }
                        if !evicted.is_empty() {
                            debug!(count = evicted.len(), "Evicted expired jobs");
                        }
                    }
                }
            }
            info!("Eviction loop stopped");
        });
    }

    /// Validate and admit a document, then start processing it.
    /// Returns the new job id; nothing is created when this fails.
    pub fn submit(&self, document: Document, request: JobRequest) -> Result<String, OrchestratorError> {
        let language = request.language.trim().to_lowercase();
        if !self.config.supports_language(&language) {
            return Err(reject(
                "invalid_request",
                OrchestratorError::InvalidRequest(format!("unsupported language: {language}")),
            ));
        }

        let max_units = request
            .max_units
            .map_or(self.config.max_units, |m| m.min(self.config.max_units));
        let units = document.prepared_units(max_units);
        if units.is_empty() {
            return Err(reject(
                "invalid_request",
                OrchestratorError::InvalidRequest("document has no units with text".to_string()),
            ));
        }

        let stages = StagePlan {
            quiz: request.generate_quiz,
            render: request.generate_video,
        };
        let unit_numbers: Vec<u32> = units.iter().map(|u| u.unit_number).collect();
        let job_id = Uuid::new_v4().to_string();

        let handle = {
            let _admission = self.admission.lock().unwrap_or_else(PoisonError::into_inner);
            let limit = self.config.max_concurrent_jobs;
            if limit > 0 && self.registry.active_count() >= limit {
                return Err(reject("too_many_jobs", OrchestratorError::TooManyJobs { limit }));
            }

            // Channel first, so a subscriber that sees the job also finds it.
            self.broadcaster.register(&job_id);
            let cell = self.registry.insert(Job::new(
                job_id.clone(),
                document.filename.clone(),
                document.mode,
                language.clone(),
                &unit_numbers,
                stages,
            ));
            JobHandle {
                cell,
                broadcaster: Arc::clone(&self.broadcaster),
            }
        };

        metrics::JOBS_SUBMITTED
            .with_label_values(&[document.mode.as_str()])
            .inc();
        metrics::JOBS_ACTIVE.inc();
        info!(
            job_id = %job_id,
            filename = %document.filename,
            mode = %document.mode,
            language = %language,
            units = units.len(),
            "Job submitted"
        );

        let run = JobRun {
            handle,
            units,
            unit_config: UnitJobConfig {
                job_id: job_id.clone(),
                mode: document.mode,
                language,
                style: request.style,
                stages,
            },
            policy: request.assembly_policy.unwrap_or(self.config.assembly_policy),
            config: self.config.clone(),
            processor: Arc::clone(&self.processor),
            assembler: Arc::clone(&self.assembler),
            unit_slots: Arc::clone(&self.unit_slots),
            benchmarks: Arc::clone(&self.benchmarks),
        };
        tokio::spawn(run.execute());

        Ok(job_id)
    }

    /// Cancel a live job. Dispatch stops; units already running finish.
    pub fn cancel(&self, job_id: &str) -> Result<Job, OrchestratorError> {
        let handle = self.handle(job_id)?;
        let outcome = handle.mutate(|job| {
            if job.status.is_terminal() {
                return Err(OrchestratorError::InvalidState {
                    expected: "pending or processing".to_string(),
                    actual: job.status,
                });
            }
            if job.status == JobStatus::Pending {
                job.transition(JobStatus::Processing)?;
            }
            job.transition(JobStatus::Cancelled)?;
            job.current_step = "Cancelled".to_string();
            Ok(job.clone())
        });
        if outcome.is_ok() {
            info!(job_id = %job_id, "Job cancelled");
        }
        outcome
    }

    pub fn get_status(&self, job_id: &str) -> Result<Job, OrchestratorError> {
        Ok(self.handle(job_id)?.cell.snapshot())
    }

    /// Final artifact and per-unit outputs of a completed job.
    pub fn get_result(&self, job_id: &str) -> Result<JobResult, OrchestratorError> {
        let cell = self
            .registry
            .get(job_id)
            .ok_or_else(|| OrchestratorError::NotFound(job_id.to_string()))?;
        let status = cell.snapshot().status;
        if status != JobStatus::Completed {
            return Err(OrchestratorError::InvalidState {
                expected: JobStatus::Completed.to_string(),
                actual: status,
            });
        }
        cell.result()
            .ok_or_else(|| OrchestratorError::NotFound(job_id.to_string()))
    }

    /// Most recent jobs, newest first.
    pub fn list(&self, limit: usize) -> Vec<JobSummary> {
        self.registry.list(limit)
    }

    pub fn active_jobs(&self) -> usize {
        self.registry.active_count()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<ProgressBroadcaster> {
        &self.broadcaster
    }

    pub fn processor(&self) -> &Arc<UnitProcessor> {
        &self.processor
    }

    /// Benchmark records of completed jobs, newest first.
    pub fn benchmark_history(&self, limit: usize) -> Vec<BenchmarkRecord> {
        self.benchmarks.history(limit)
    }

    /// Benchmark records for `job_ids`, in the order given.
    pub fn compare_benchmarks(&self, job_ids: &[String]) -> Vec<BenchmarkRecord> {
        self.benchmarks.compare(job_ids)
    }

    /// In-process push/poll transport over this orchestrator's jobs.
    pub fn transport(&self) -> LocalProgressTransport {
        LocalProgressTransport::new(Arc::clone(&self.registry), Arc::clone(&self.broadcaster))
    }

    fn handle(&self, job_id: &str) -> Result<JobHandle, OrchestratorError> {
        let cell = self
            .registry
            .get(job_id)
            .ok_or_else(|| OrchestratorError::NotFound(job_id.to_string()))?;
        Ok(JobHandle {
            cell,
            broadcaster: Arc::clone(&self.broadcaster),
        })
    }
}

fn reject(reason: &str, error: OrchestratorError) -> OrchestratorError {
    metrics::JOBS_REJECTED.with_label_values(&[reason]).inc();
    warn!(reason, error = %error, "Job submission rejected");
    error
}
