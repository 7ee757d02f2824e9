//! Contracts for the external services a job depends on.
//!
//! Narration, quiz generation, rendering/synthesis and final concatenation
//! all live outside this crate. The traits here define what the pipeline
//! needs from them; [`HttpCollaborators`] is the JSON-over-HTTP client used
//! in production and `crate::testing` has controllable mocks.

mod config;
mod error;
mod http;
mod traits;
mod types;

pub use config::CollaboratorsConfig;
pub use error::CollaboratorError;
pub use http::HttpCollaborators;
pub use traits::{ClipConcatenator, Collaborators, NarrationGenerator, QuizGenerator, UnitRenderer};
pub use types::{Difficulty, Question, RenderOutput, StyleConfig};
