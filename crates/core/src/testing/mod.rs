//! Testing utilities and mock implementations.
//!
//! Every collaborator has a controllable mock that records calls by unit
//! number and can inject transient or permanent failures, delays, and
//! blocking gates per unit.
//!
//! # Example
//!
//! ```rust,ignore
//! use lectern_core::testing::{fixtures, MockSet};
//!
//! let mocks = MockSet::new();
//! mocks.narrator.fail_unit(2, CollaboratorError::permanent("unreadable")).await;
//!
//! let orchestrator = fixtures::orchestrator(&mocks);
//! let job_id = orchestrator.submit(fixtures::slide_deck(3), JobRequest::default())?;
//! ```

mod failing_cache;
mod mock_concatenator;
mod mock_narrator;
mod mock_quiz;
mod mock_renderer;
mod reporter;
mod script;

use std::sync::Arc;

pub use failing_cache::FailingNarrationCache;
pub use mock_concatenator::MockConcatenator;
pub use mock_narrator::MockNarrator;
pub use mock_quiz::MockQuizGenerator;
pub use mock_renderer::MockRenderer;
pub use reporter::RecordingReporter;
pub use script::CallScript;

use crate::collaborators::Collaborators;

/// One mock per collaborator role, shared with whatever they are wired into.
#[derive(Debug, Clone, Default)]
pub struct MockSet {
    pub narrator: Arc<MockNarrator>,
    pub quiz: Arc<MockQuizGenerator>,
    pub renderer: Arc<MockRenderer>,
    pub concatenator: Arc<MockConcatenator>,
}

impl MockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            narrator: self.narrator.clone(),
            quiz: self.quiz.clone(),
            renderer: self.renderer.clone(),
            concatenator: self.concatenator.clone(),
        }
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use super::MockSet;
    use crate::cache::{InMemoryNarrationCache, NarrationCache};
    use crate::document::{Document, UnitContent};
    use crate::job::{Job, JobMode};
    use crate::orchestrator::{JobOrchestrator, OrchestratorConfig};
    use crate::processor::{ProcessorConfig, RetryConfig, UnitProcessor};
    use crate::progress::{ProgressBroadcaster, ProgressConfig};

    /// Slide deck with units `1..=count`, each with distinct text.
    pub fn slide_deck(count: u32) -> Document {
        let units = (1..=count)
            .map(|n| {
                UnitContent::new(
                    n,
                    format!("Slide {n}"),
                    format!("Key points of slide {n}: photosynthesis step {n}."),
                )
            })
            .collect();
        Document::new("lecture.pptx", JobMode::SlideDeck, units)
    }

    /// Processor config with millisecond retries.
    pub fn processor_config() -> ProcessorConfig {
        ProcessorConfig::default().with_retry(RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        })
    }

    pub fn orchestrator_config() -> OrchestratorConfig {
        OrchestratorConfig {
            max_parallel_units: 4,
            ..OrchestratorConfig::default()
        }
    }

    pub fn progress_config() -> ProgressConfig {
        ProgressConfig {
            subscribe_attempts: 3,
            subscribe_backoff_ms: 5,
            poll_interval_ms: 20,
            ..ProgressConfig::default()
        }
    }

    /// Orchestrator over `mocks` with an in-memory narration cache.
    pub fn orchestrator(mocks: &MockSet) -> JobOrchestrator {
        orchestrator_with(mocks, orchestrator_config())
    }

    pub fn orchestrator_with(mocks: &MockSet, config: OrchestratorConfig) -> JobOrchestrator {
        orchestrator_with_cache(mocks, config, Arc::new(InMemoryNarrationCache::new()))
    }

    pub fn orchestrator_with_cache(
        mocks: &MockSet,
        config: OrchestratorConfig,
        cache: Arc<dyn NarrationCache>,
    ) -> JobOrchestrator {
        let processor = UnitProcessor::new(processor_config(), mocks.collaborators(), cache);
        JobOrchestrator::new(
            config,
            Arc::new(processor),
            Arc::new(ProgressBroadcaster::new(256)),
        )
    }

    /// Polls until the job is terminal. Panics after `timeout`.
    pub async fn wait_for_terminal(
        orchestrator: &JobOrchestrator,
        job_id: &str,
        timeout: Duration,
    ) -> Job {
        wait_for(orchestrator, job_id, timeout, |job| job.status.is_terminal()).await
    }

    /// Polls until `condition` holds for the job. Panics after `timeout`.
    pub async fn wait_for(
        orchestrator: &JobOrchestrator,
        job_id: &str,
        timeout: Duration,
        condition: impl Fn(&Job) -> bool,
    ) -> Job {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let job = match orchestrator.get_status(job_id) {
                Ok(job) => job,
                Err(e) => panic!("job {job_id} disappeared: {e}"),
            };
            if condition(&job) {
                return job;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting on job {job_id}: {job:?}");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
