//! Final assembly of per-unit clips.
//!
//! Clips are always joined in ascending unit order, whatever order the
//! units finished in. Units without a usable clip are skipped or abort the
//! assembly depending on [`AssemblyPolicy`]; they are never reordered.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::collaborators::{ClipConcatenator, CollaboratorError};
use crate::processor::{run_with_retry, RetryConfig};

/// What to do with units that have no clip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyPolicy {
    /// Leave them out of the final artifact.
    #[default]
    SkipFailed,
    /// Fail the assembly.
    FailFatal,
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("unit {0} has no clip to assemble")]
    MissingClip(u32),

    #[error("no clips to assemble")]
    NoClips,

    #[error("concatenation failed: {0}")]
    Concatenate(#[from] CollaboratorError),
}

/// One unit's contribution. `clip_ref` is `None` when the unit failed or
/// produced no clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipInput {
    pub unit_number: u32,
    pub clip_ref: Option<String>,
}

impl ClipInput {
    pub fn new(unit_number: u32, clip_ref: Option<String>) -> Self {
        Self {
            unit_number,
            clip_ref,
        }
    }
}

/// Ordered clip list ready for the concatenator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyPlan {
    pub units: Vec<u32>,
    pub clips: Vec<String>,
    pub skipped: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyOutput {
    pub artifact: String,
    pub units: Vec<u32>,
    pub skipped: Vec<u32>,
}

/// Sorts inputs by unit number and applies the policy to missing clips.
pub fn plan(mut inputs: Vec<ClipInput>, policy: AssemblyPolicy) -> Result<AssemblyPlan, AssemblyError> {
    inputs.sort_by_key(|input| input.unit_number);

    let mut plan = AssemblyPlan {
        units: Vec::with_capacity(inputs.len()),
        clips: Vec::with_capacity(inputs.len()),
        skipped: Vec::new(),
    };
    for input in inputs {
        match (input.clip_ref, policy) {
            (Some(clip), _) => {
                plan.units.push(input.unit_number);
                plan.clips.push(clip);
            }
            (None, AssemblyPolicy::SkipFailed) => plan.skipped.push(input.unit_number),
            (None, AssemblyPolicy::FailFatal) => {
                return Err(AssemblyError::MissingClip(input.unit_number))
            }
        }
    }

    if plan.clips.is_empty() {
        return Err(AssemblyError::NoClips);
    }
    Ok(plan)
}

/// Joins per-unit clips through a [`ClipConcatenator`].
///
/// Transient concatenation failures are retried with the same policy and
/// per-attempt deadline as the unit stages.
pub struct VideoAssembler {
    concatenator: Arc<dyn ClipConcatenator>,
    retry: RetryConfig,
    timeout: Option<Duration>,
}

impl VideoAssembler {
    pub fn new(
        concatenator: Arc<dyn ClipConcatenator>,
        retry: RetryConfig,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            concatenator,
            retry,
            timeout,
        }
    }

    /// Checks the concatenation backend before any unit is dispatched.
    pub async fn validate(&self) -> Result<(), AssemblyError> {
        self.concatenator.validate().await?;
        Ok(())
    }

    pub async fn assemble(
        &self,
        inputs: Vec<ClipInput>,
        policy: AssemblyPolicy,
    ) -> Result<AssemblyOutput, AssemblyError> {
        let plan = plan(inputs, policy)?;
        if !plan.skipped.is_empty() {
            warn!(skipped = ?plan.skipped, "Assembling without failed units");
        }

        let concatenator = &self.concatenator;
        let clips = plan.clips.as_slice();
        let artifact = run_with_retry(&self.retry, self.timeout, "assembly", None, move || {
            concatenator.concatenate(clips)
        })
        .await?;
        info!(units = plan.units.len(), artifact = %artifact, "Final artifact assembled");

        Ok(AssemblyOutput {
            artifact,
            units: plan.units,
            skipped: plan.skipped,
        })
    }
}
