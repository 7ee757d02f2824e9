//! Per-unit processing.
//!
//! [`UnitProcessor`] drives one unit through its ordered stages:
//! - Narration: cache-checked, single-flight per cache key
//! - Quiz: optional, its failure never fails the unit
//! - Rendering and synthesis: may fall back to placeholder narration
//! - Clip assembly: picks the clip handed to the final assembler
//!
//! Every sub-state change is pushed to a [`StageReporter`] immediately so the
//! job record shows mid-unit progress. Transient collaborator failures are
//! retried at the stage boundary by [`run_with_retry`].

mod config;
mod retry;
mod types;
mod unit;

pub use config::{ProcessorConfig, RetryConfig};
pub use retry::run_with_retry;
pub use types::{ProcessorError, StageReporter, StageUpdate, UnitJobConfig, UnitResult};
pub use unit::UnitProcessor;
