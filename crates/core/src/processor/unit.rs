//! Unit processor implementation.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheKey, KeyedLocks, NarrationCache};
use crate::collaborators::Collaborators;
use crate::document::UnitContent;
use crate::job::{Stage, StageState};
use crate::metrics;
use crate::quality::NarrationMeta;

use super::config::ProcessorConfig;
use super::retry::run_with_retry;
use super::types::{ProcessorError, StageReporter, StageUpdate, UnitJobConfig, UnitResult};

/// Drives single units through narration, quiz, rendering and clip
/// selection.
///
/// Holds no per-unit state: one processor serves every unit of every job,
/// concurrently.
pub struct UnitProcessor {
    config: ProcessorConfig,
    collaborators: Collaborators,
    cache: Arc<dyn NarrationCache>,
    flights: KeyedLocks,
}

impl UnitProcessor {
    pub fn new(
        config: ProcessorConfig,
        collaborators: Collaborators,
        cache: Arc<dyn NarrationCache>,
    ) -> Self {
        Self {
            config,
            collaborators,
            cache,
            flights: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn cache(&self) -> &Arc<dyn NarrationCache> {
        &self.cache
    }

    /// Processes one unit. Never fails: stage errors end up in the result
    /// and in the reported sub-states.
    pub async fn process(
        &self,
        unit: &UnitContent,
        job: &UnitJobConfig,
        reporter: &dyn StageReporter,
    ) -> UnitResult {
        let mut result = UnitResult::new(unit.unit_number);
        debug!(job_id = %job.job_id, unit = unit.unit_number, "Processing unit");

        let narration = self.narrate(unit, job, reporter, &mut result).await.ok();

        if job.stages.quiz {
            self.quiz(unit, job, narration.as_deref(), reporter, &mut result)
                .await;
        }

        let mut render_failed = false;
        if job.stages.render {
            render_failed = !self
                .render(unit, job, narration.as_deref(), reporter, &mut result)
                .await;
        }

        // Clip assembly: the rendered clip is what the final assembler gets.
        result.clip_ref = result.render.as_ref().map(|r| r.clip_ref.clone());
        result.failed = narration.is_none() || render_failed;

        let outcome = if result.failed { "failed" } else { "success" };
        metrics::UNITS_PROCESSED.with_label_values(&[outcome]).inc();
        debug!(
            job_id = %job.job_id,
            unit = unit.unit_number,
            failed = result.failed,
            cached = result.narration_cached,
            "Unit finished"
        );
        result
    }

    async fn narrate(
        &self,
        unit: &UnitContent,
        job: &UnitJobConfig,
        reporter: &dyn StageReporter,
        result: &mut UnitResult,
    ) -> Result<String, ProcessorError> {
        report(reporter, unit, Stage::Narration, StageState::Processing, None).await;
        let started = Instant::now();

        match self.cached_narration(unit, job).await {
            Ok(Narration { text, meta, cached }) => {
                observe(Stage::Narration, true, started);
                result.narration = Some(text.clone());
                result.narration_cached = cached;
                result.narration_meta = Some(meta);
                report(reporter, unit, Stage::Narration, StageState::Completed, None).await;
                Ok(text)
            }
            Err(e) => {
                observe(Stage::Narration, false, started);
                warn!(job_id = %job.job_id, unit = unit.unit_number, error = %e, "Narration failed");
                result.record_error(&e);
                report(
                    reporter,
                    unit,
                    Stage::Narration,
                    StageState::Failed,
                    Some(e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Cache first, then the narrator. Concurrent misses on one key wait for
    /// the first caller and pick up its entry.
    async fn cached_narration(
        &self,
        unit: &UnitContent,
        job: &UnitJobConfig,
    ) -> Result<Narration, ProcessorError> {
        let key = CacheKey::compute(
            &job.language,
            &self.config.model_version,
            job.mode,
            &unit.full_text(),
        );

        if let Some(entry) = self.lookup(&key) {
            metrics::NARRATION_CACHE_HITS.inc();
            return Ok(Narration::cached(entry));
        }

        let _flight = self.flights.lock(key.as_str()).await;
        if let Some(entry) = self.lookup(&key) {
            metrics::NARRATION_CACHE_HITS.inc();
            return Ok(Narration::cached(entry));
        }
        metrics::NARRATION_CACHE_MISSES.inc();

        let narrator = &self.collaborators.narrator;
        let language = job.language.as_str();
        let style = &job.style;
        let text = run_with_retry(
            &self.config.retry,
            self.config.stage_timeout(),
            Stage::Narration.as_str(),
            Some(unit.unit_number),
            move || narrator.generate_narration(unit, language, style),
        )
        .await
        .map_err(|source| ProcessorError::Stage {
            stage: Stage::Narration,
            source,
        })?;

        let meta = NarrationMeta::analyze(&unit.full_text(), &text);
        if !meta.hallucination_ok {
            debug!(
                job_id = %job.job_id,
                unit = unit.unit_number,
                found = meta.terms_found.len(),
                required = meta.terms_required,
                "Narration misses key terms of the source"
            );
        }
        self.store(CacheEntry {
            key,
            narration: text.clone(),
            language: job.language.clone(),
            model_version: self.config.model_version.clone(),
            unit_number: unit.unit_number,
            meta: meta.clone(),
            created_at: Utc::now(),
        });
        Ok(Narration {
            text,
            meta,
            cached: false,
        })
    }

    fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.cache.get(key) {
            Ok(entry) => entry,
            Err(e) => {
                let e = ProcessorError::from(e);
                warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                metrics::NARRATION_CACHE_ERRORS
                    .with_label_values(&["get"])
                    .inc();
                None
            }
        }
    }

    fn store(&self, entry: CacheEntry) {
        if let Err(e) = self.cache.put(&entry) {
            let e = ProcessorError::from(e);
            warn!(key = %entry.key, error = %e, "Cache write failed");
            metrics::NARRATION_CACHE_ERRORS
                .with_label_values(&["put"])
                .inc();
        }
    }

    async fn quiz(
        &self,
        unit: &UnitContent,
        job: &UnitJobConfig,
        narration: Option<&str>,
        reporter: &dyn StageReporter,
        result: &mut UnitResult,
    ) {
        let Some(narration) = narration else {
            report(reporter, unit, Stage::Quiz, StageState::Skipped, None).await;
            return;
        };

        report(reporter, unit, Stage::Quiz, StageState::Processing, None).await;
        let started = Instant::now();
        let quiz = &self.collaborators.quiz;
        let tiers = self.config.quiz_tiers.as_slice();

        let outcome = run_with_retry(
            &self.config.retry,
            self.config.stage_timeout(),
            Stage::Quiz.as_str(),
            Some(unit.unit_number),
            move || quiz.generate_quiz(unit, narration, tiers),
        )
        .await;

        match outcome {
            Ok(questions) => {
                observe(Stage::Quiz, true, started);
                result.questions = questions;
                report(reporter, unit, Stage::Quiz, StageState::Completed, None).await;
            }
            Err(source) => {
                observe(Stage::Quiz, false, started);
                let e = ProcessorError::Stage {
                    stage: Stage::Quiz,
                    source,
                };
                warn!(job_id = %job.job_id, unit = unit.unit_number, error = %e, "Quiz generation failed");
                result.record_error(&e);
                report(
                    reporter,
                    unit,
                    Stage::Quiz,
                    StageState::Failed,
                    Some(e.to_string()),
                )
                .await;
            }
        }
    }

    /// Returns false only when rendering was attempted and failed.
    async fn render(
        &self,
        unit: &UnitContent,
        job: &UnitJobConfig,
        narration: Option<&str>,
        reporter: &dyn StageReporter,
        result: &mut UnitResult,
    ) -> bool {
        let placeholder;
        let narration = match narration {
            Some(text) => text,
            None if self.config.placeholder_narration => {
                debug!(job_id = %job.job_id, unit = unit.unit_number, "Rendering with placeholder narration");
                placeholder = unit.full_text();
                placeholder.as_str()
            }
            None => {
                report(reporter, unit, Stage::Render, StageState::Skipped, None).await;
                return true;
            }
        };

        report(reporter, unit, Stage::Render, StageState::Processing, None).await;
        let started = Instant::now();
        let renderer = &self.collaborators.renderer;

        let outcome = run_with_retry(
            &self.config.retry,
            self.config.stage_timeout(),
            Stage::Render.as_str(),
            Some(unit.unit_number),
            move || renderer.render_unit(unit, narration),
        )
        .await;

        match outcome {
            Ok(output) => {
                observe(Stage::Render, true, started);
                result.render = Some(output);
                report(reporter, unit, Stage::Render, StageState::Completed, None).await;
                true
            }
            Err(source) => {
                observe(Stage::Render, false, started);
                let e = ProcessorError::Stage {
                    stage: Stage::Render,
                    source,
                };
                warn!(job_id = %job.job_id, unit = unit.unit_number, error = %e, "Rendering failed");
                result.record_error(&e);
                report(
                    reporter,
                    unit,
                    Stage::Render,
                    StageState::Failed,
                    Some(e.to_string()),
                )
                .await;
                false
            }
        }
    }
}

struct Narration {
    text: String,
    meta: NarrationMeta,
    cached: bool,
}

impl Narration {
    fn cached(entry: CacheEntry) -> Self {
        Self {
            text: entry.narration,
            meta: entry.meta,
            cached: true,
        }
    }
}

async fn report(
    reporter: &dyn StageReporter,
    unit: &UnitContent,
    stage: Stage,
    state: StageState,
    error: Option<String>,
) {
    reporter
        .report(StageUpdate {
            unit_number: unit.unit_number,
            stage,
            state,
            error,
        })
        .await;
}

fn observe(stage: Stage, ok: bool, started: Instant) {
    metrics::STAGE_DURATION
        .with_label_values(&[stage.as_str(), if ok { "success" } else { "failed" }])
        .observe(started.elapsed().as_secs_f64());
}
