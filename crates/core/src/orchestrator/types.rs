//! Types for the job orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembler::AssemblyPolicy;
use crate::collaborators::StyleConfig;
use crate::job::JobStatus;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Submission rejected before a job was created.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Admission limit reached.
    #[error("too many active jobs (limit {limit})")]
    TooManyJobs { limit: usize },

    /// Job not found.
    #[error("job not found: {0}")]
    NotFound(String),

    /// Invalid job state for operation.
    #[error("invalid job state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: JobStatus },

    /// Job record error.
    #[error("job error: {0}")]
    Job(#[from] crate::job::JobError),

    /// Final assembly error.
    #[error("assembly error: {0}")]
    Assembly(#[from] crate::assembler::AssemblyError),

    /// Collaborator setup error.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] crate::collaborators::CollaboratorError),

    /// Progress transport error.
    #[error("progress error: {0}")]
    Progress(#[from] crate::progress::ProgressError),

    /// Narration cache error.
    #[error("cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),
}

/// Per-job options given at submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default = "default_language")]
    pub language: String,

    /// Run the quiz stage.
    #[serde(default = "default_true")]
    pub generate_quiz: bool,

    /// Render units and assemble the final video.
    #[serde(default = "default_true")]
    pub generate_video: bool,

    /// Capped by the orchestrator's own `max_units`.
    #[serde(default)]
    pub max_units: Option<usize>,

    #[serde(default)]
    pub style: StyleConfig,

    /// Overrides the configured assembly policy for this job.
    #[serde(default)]
    pub assembly_policy: Option<AssemblyPolicy>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JobRequest {
    fn default() -> Self {
        Self {
            language: default_language(),
            generate_quiz: true,
            generate_video: true,
            max_units: None,
            style: StyleConfig::default(),
            assembly_policy: None,
        }
    }
}

impl JobRequest {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_quiz(mut self, enabled: bool) -> Self {
        self.generate_quiz = enabled;
        self
    }

    pub fn with_video(mut self, enabled: bool) -> Self {
        self.generate_video = enabled;
        self
    }

    pub fn with_assembly_policy(mut self, policy: AssemblyPolicy) -> Self {
        self.assembly_policy = Some(policy);
        self
    }

    pub fn with_max_units(mut self, max_units: usize) -> Self {
        self.max_units = Some(max_units);
        self
    }
}
