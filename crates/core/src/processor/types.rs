//! Types for the processor module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheError;
use crate::collaborators::{CollaboratorError, Question, RenderOutput, StyleConfig};
use crate::job::{JobMode, Stage, StagePlan, StageState};
use crate::quality::NarrationMeta;

/// Job-level settings every unit of a job is processed with.
#[derive(Debug, Clone)]
pub struct UnitJobConfig {
    pub job_id: String,
    pub mode: JobMode,
    pub language: String,
    pub style: StyleConfig,
    pub stages: StagePlan,
}

/// One sub-state change reported while a unit is processed.
#[derive(Debug, Clone, PartialEq)]
pub struct StageUpdate {
    pub unit_number: u32,
    pub stage: Stage,
    pub state: StageState,
    pub error: Option<String>,
}

/// Receives sub-state changes as soon as they happen.
#[async_trait]
pub trait StageReporter: Send + Sync {
    async fn report(&self, update: StageUpdate);
}

/// Errors raised inside a unit's stages. These never leave the unit task;
/// they are rendered into the unit's `error` field.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: CollaboratorError,
    },

    #[error("narration cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

/// Outputs of one processed unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitResult {
    pub unit_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    /// Narration came from the cache.
    pub narration_cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_meta: Option<NarrationMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderOutput>,
    /// Clip to feed the assembler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_ref: Option<String>,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitResult {
    pub(crate) fn new(unit_number: u32) -> Self {
        Self {
            unit_number,
            narration: None,
            narration_cached: false,
            narration_meta: None,
            questions: Vec::new(),
            render: None,
            clip_ref: None,
            failed: false,
            error: None,
        }
    }

    pub(crate) fn record_error(&mut self, error: &ProcessorError) {
        let message = error.to_string();
        self.error = Some(match self.error.take() {
            Some(previous) => format!("{previous}; {message}"),
            None => message,
        });
    }
}
