//! Core job data types.
//!
//! `Job` doubles as the wire status contract: its serde field names are the
//! ones status consumers read (`job_id`, `current_slide`, `slides_progress`,
//! ...), so renaming a field here is a breaking API change.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::JobError;
use crate::processor::UnitResult;

// ============================================================================
// Enumerations
// ============================================================================

/// How the source document is split into units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// One unit per slide.
    SlideDeck,
    /// One unit per page.
    PaginatedDocument,
    /// Free text chunked into units by word budget.
    LongFormChunked,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::SlideDeck => "slide_deck",
            JobMode::PaginatedDocument => "paginated_document",
            JobMode::LongFormChunked => "long_form_chunked",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall job status.
///
/// Legal transitions: `Pending -> Processing -> {Completed, Failed, Cancelled}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three independently tracked processing facets of a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Narration,
    Quiz,
    Render,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Narration, Stage::Quiz, Stage::Render];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Narration => "narration",
            Stage::Quiz => "quiz",
            Stage::Render => "render",
        }
    }

    /// Human readable label used for `current_step`.
    pub fn step_label(&self) -> &'static str {
        match self {
            Stage::Narration => "Generating narration",
            Stage::Quiz => "Generating quiz",
            Stage::Render => "Rendering unit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one sub-state of a unit.
///
/// `Completed`, `Failed` and `Skipped` are resolved and final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl StageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Pending => "pending",
            StageState::Processing => "processing",
            StageState::Completed => "completed",
            StageState::Failed => "failed",
            StageState::Skipped => "skipped",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            StageState::Completed | StageState::Failed | StageState::Skipped
        )
    }

    /// Re-entering the current state is allowed (a retried stage reports
    /// `Processing` again); leaving a resolved state is not.
    pub fn can_transition_to(&self, next: StageState) -> bool {
        if *self == next {
            return true;
        }
        match self {
            StageState::Pending => true,
            StageState::Processing => next != StageState::Pending,
            StageState::Completed | StageState::Failed | StageState::Skipped => false,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Units
// ============================================================================

/// Which optional stages a job runs. Narration is always required.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StagePlan {
    pub quiz: bool,
    pub render: bool,
}

impl StagePlan {
    pub fn is_required(&self, stage: Stage) -> bool {
        match stage {
            Stage::Narration => true,
            Stage::Quiz => self.quiz,
            Stage::Render => self.render,
        }
    }

    pub fn required_count(&self) -> usize {
        Stage::ALL.iter().filter(|s| self.is_required(**s)).count()
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            quiz: true,
            render: true,
        }
    }
}

/// Per-unit progress record (one entry of `slides_progress`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitStatus {
    #[serde(rename = "slide_number")]
    pub unit_number: u32,
    pub narration: StageState,
    pub quiz: StageState,
    pub render: StageState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitStatus {
    /// Stages not in the plan start out `Skipped`.
    pub fn new(unit_number: u32, plan: StagePlan) -> Self {
        let initial = |stage| {
            if plan.is_required(stage) {
                StageState::Pending
            } else {
                StageState::Skipped
            }
        };
        Self {
            unit_number,
            narration: initial(Stage::Narration),
            quiz: initial(Stage::Quiz),
            render: initial(Stage::Render),
            error: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> StageState {
        match stage {
            Stage::Narration => self.narration,
            Stage::Quiz => self.quiz,
            Stage::Render => self.render,
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut StageState {
        match stage {
            Stage::Narration => &mut self.narration,
            Stage::Quiz => &mut self.quiz,
            Stage::Render => &mut self.render,
        }
    }

    /// Sets a sub-state, refusing regressions out of a resolved state.
    pub fn set_stage(&mut self, stage: Stage, next: StageState) -> Result<bool, JobError> {
        let unit_number = self.unit_number;
        let current = self.stage_mut(stage);
        if !current.can_transition_to(next) {
            return Err(JobError::StageRegression {
                unit_number,
                stage,
                from: *current,
                to: next,
            });
        }
        let changed = *current != next;
        *current = next;
        Ok(changed)
    }

    pub fn is_resolved(&self) -> bool {
        Stage::ALL.iter().all(|s| self.stage(*s).is_resolved())
    }

    /// A unit fails when narration or rendering fails; a quiz failure is
    /// recorded but does not fail the unit.
    pub fn is_failed(&self) -> bool {
        self.narration == StageState::Failed || self.render == StageState::Failed
    }

    fn resolved_required(&self, plan: StagePlan) -> usize {
        Stage::ALL
            .iter()
            .filter(|s| plan.is_required(**s) && self.stage(**s).is_resolved())
            .count()
    }
}

// ============================================================================
// Job
// ============================================================================

/// Canonical record of one job's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    pub filename: String,
    pub mode: JobMode,
    pub language: String,
    pub status: JobStatus,
    /// 0-100, never decreases.
    pub progress: u8,
    #[serde(rename = "current_slide")]
    pub current_unit: Option<u32>,
    #[serde(rename = "total_slides")]
    pub total_units: u32,
    pub current_step: String,
    #[serde(rename = "slides_progress")]
    pub units: Vec<UnitStatus>,
    #[serde(default)]
    pub stages: StagePlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        mode: JobMode,
        language: impl Into<String>,
        unit_numbers: &[u32],
        stages: StagePlan,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            filename: filename.into(),
            mode,
            language: language.into(),
            status: JobStatus::Pending,
            progress: 0,
            current_unit: None,
            total_units: unit_numbers.len() as u32,
            current_step: "Initializing".to_string(),
            units: unit_numbers
                .iter()
                .map(|n| UnitStatus::new(*n, stages))
                .collect(),
            stages,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Advances `updated_at` strictly past its previous value.
    pub fn touch(&mut self) {
        let now = Utc::now();
        let floor = self.updated_at + Duration::microseconds(1);
        self.updated_at = if now > floor { now } else { floor };
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        if next.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        if next == JobStatus::Completed {
            self.progress = 100;
        }
        Ok(())
    }

    /// Records a sub-state change for one unit and recomputes progress.
    pub fn update_stage(
        &mut self,
        unit_number: u32,
        stage: Stage,
        state: StageState,
        error: Option<String>,
    ) -> Result<(), JobError> {
        let job_id = self.id.clone();
        let unit = self
            .units
            .iter_mut()
            .find(|u| u.unit_number == unit_number)
            .ok_or(JobError::UnitNotFound {
                job_id,
                unit_number,
            })?;
        unit.set_stage(stage, state)?;
        if let Some(error) = error {
            unit.error = Some(match unit.error.take() {
                Some(previous) => format!("{previous}; {error}"),
                None => error,
            });
        }
        self.current_unit = Some(unit_number);
        self.current_step = stage.step_label().to_string();
        self.recompute_progress();
        self.touch();
        Ok(())
    }

    pub fn set_step(&mut self, step: impl Into<String>) {
        self.current_step = step.into();
        self.touch();
    }

    /// Resolved required sub-states over all required sub-states, floored.
    /// Held at 99 until the job completes; never lowers the stored value.
    pub fn recompute_progress(&mut self) {
        let per_unit = self.stages.required_count();
        let total = self.units.len() * per_unit;
        let raw = if total == 0 {
            100
        } else {
            let resolved: usize = self
                .units
                .iter()
                .map(|u| u.resolved_required(self.stages))
                .sum();
            (resolved * 100 / total) as u8
        };
        let capped = if self.status == JobStatus::Completed {
            100
        } else {
            raw.min(99)
        };
        self.progress = self.progress.max(capped);
    }

    pub fn unit(&self, unit_number: u32) -> Option<&UnitStatus> {
        self.units.iter().find(|u| u.unit_number == unit_number)
    }

    pub fn failed_units(&self) -> Vec<u32> {
        self.units
            .iter()
            .filter(|u| u.is_failed())
            .map(|u| u.unit_number)
            .collect()
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id.clone(),
            filename: self.filename.clone(),
            mode: self.mode,
            status: self.status,
            progress: self.progress,
            created_at: self.created_at,
        }
    }
}

/// Compact listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub filename: String,
    pub mode: JobMode,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

/// Final outputs of a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    pub mode: JobMode,
    pub language: String,
    /// Per-unit outputs in ascending unit order.
    pub units: Vec<UnitResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_artifact: Option<String>,
    pub failed_units: Vec<u32>,
    pub cache_hits: u32,
    pub cache_misses: u32,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(units: &[u32], stages: StagePlan) -> Job {
        Job::new("job-1", "deck.pptx", JobMode::SlideDeck, "en", units, stages)
    }

    #[test]
    fn test_status_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_completed_stage_never_regresses() {
        let mut unit = UnitStatus::new(1, StagePlan::default());
        unit.set_stage(Stage::Narration, StageState::Processing).unwrap();
        unit.set_stage(Stage::Narration, StageState::Completed).unwrap();

        for next in [
            StageState::Pending,
            StageState::Processing,
            StageState::Failed,
            StageState::Skipped,
        ] {
            let err = unit.set_stage(Stage::Narration, next).unwrap_err();
            assert!(matches!(err, JobError::StageRegression { .. }));
        }
        assert_eq!(unit.narration, StageState::Completed);
    }

    #[test]
    fn test_disabled_stages_start_skipped() {
        let unit = UnitStatus::new(
            3,
            StagePlan {
                quiz: false,
                render: true,
            },
        );
        assert_eq!(unit.quiz, StageState::Skipped);
        assert_eq!(unit.narration, StageState::Pending);
        assert_eq!(unit.render, StageState::Pending);
    }

    #[test]
    fn test_progress_counts_required_stages_only() {
        let plan = StagePlan {
            quiz: false,
            render: true,
        };
        let mut job = job(&[1, 2], plan);
        assert_eq!(job.progress, 0);

        job.update_stage(1, Stage::Narration, StageState::Completed, None)
            .unwrap();
        assert_eq!(job.progress, 25);
        job.update_stage(1, Stage::Render, StageState::Completed, None)
            .unwrap();
        assert_eq!(job.progress, 50);
        job.update_stage(2, Stage::Narration, StageState::Failed, Some("boom".into()))
            .unwrap();
        job.update_stage(2, Stage::Render, StageState::Skipped, None)
            .unwrap();
        assert_eq!(job.progress, 99);
        assert_eq!(job.failed_units(), vec![2]);

        job.transition(JobStatus::Processing).unwrap();
        job.transition(JobStatus::Completed).unwrap();
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_progress_held_below_100_until_completed() {
        let mut job = job(&[1], StagePlan::default());
        job.transition(JobStatus::Processing).unwrap();
        for stage in Stage::ALL {
            job.update_stage(1, stage, StageState::Completed, None).unwrap();
        }
        assert_eq!(job.progress, 99);
        job.transition(JobStatus::Cancelled).unwrap();
        assert_eq!(job.progress, 99);
    }

    #[test]
    fn test_updated_at_strictly_increases() {
        let mut job = job(&[1], StagePlan::default());
        let mut previous = job.updated_at;
        for _ in 0..100 {
            job.touch();
            assert!(job.updated_at > previous);
            previous = job.updated_at;
        }
    }

    #[test]
    fn test_terminal_transition_sets_completed_at() {
        let mut job = job(&[1], StagePlan::default());
        job.transition(JobStatus::Processing).unwrap();
        assert!(job.completed_at.is_none());
        job.transition(JobStatus::Cancelled).unwrap();
        assert_eq!(job.completed_at, Some(job.updated_at));

        let err = job.transition(JobStatus::Completed).unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
    }

    #[test]
    fn test_unit_errors_accumulate() {
        let mut job = job(&[1], StagePlan::default());
        job.update_stage(1, Stage::Quiz, StageState::Failed, Some("quiz down".into()))
            .unwrap();
        job.update_stage(1, Stage::Render, StageState::Failed, Some("render down".into()))
            .unwrap();
        assert_eq!(
            job.unit(1).unwrap().error.as_deref(),
            Some("quiz down; render down")
        );
    }

    #[test]
    fn test_wire_field_names() {
        let job = job(&[1], StagePlan::default());
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["job_id"], "job-1");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total_slides"], 1);
        assert!(json["current_slide"].is_null());
        assert_eq!(json["slides_progress"][0]["slide_number"], 1);
        assert_eq!(json["slides_progress"][0]["narration"], "pending");
        assert_eq!(json["mode"], "slide_deck");
        assert_eq!(json["progress"], 0);
    }
}
