//! Collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;

use super::{CollaboratorError, Difficulty, Question, RenderOutput, StyleConfig};
use crate::document::UnitContent;

/// Produces narration text for one unit.
#[async_trait]
pub trait NarrationGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_narration(
        &self,
        unit: &UnitContent,
        language: &str,
        style: &StyleConfig,
    ) -> Result<String, CollaboratorError>;
}

/// Produces quiz questions from a unit and its narration.
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_quiz(
        &self,
        unit: &UnitContent,
        narration: &str,
        tiers: &[Difficulty],
    ) -> Result<Vec<Question>, CollaboratorError>;
}

/// Renders the unit image, synthesizes its audio and muxes them into a clip.
#[async_trait]
pub trait UnitRenderer: Send + Sync {
    fn name(&self) -> &str;

    async fn render_unit(
        &self,
        unit: &UnitContent,
        narration: &str,
    ) -> Result<RenderOutput, CollaboratorError>;
}

/// Joins per-unit clips into the final artifact.
#[async_trait]
pub trait ClipConcatenator: Send + Sync {
    fn name(&self) -> &str;

    /// `clips` are already in playback order.
    async fn concatenate(&self, clips: &[String]) -> Result<String, CollaboratorError>;

    /// Checks the backend is usable before a job dispatches any unit.
    async fn validate(&self) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// The full set of collaborators a job needs.
#[derive(Clone)]
pub struct Collaborators {
    pub narrator: Arc<dyn NarrationGenerator>,
    pub quiz: Arc<dyn QuizGenerator>,
    pub renderer: Arc<dyn UnitRenderer>,
    pub concatenator: Arc<dyn ClipConcatenator>,
}

impl Collaborators {
    /// Uses one value for all four roles.
    pub fn from_single<T>(collaborator: Arc<T>) -> Self
    where
        T: NarrationGenerator + QuizGenerator + UnitRenderer + ClipConcatenator + 'static,
    {
        Self {
            narrator: collaborator.clone(),
            quiz: collaborator.clone(),
            renderer: collaborator.clone(),
            concatenator: collaborator,
        }
    }
}
