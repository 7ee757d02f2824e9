//! Mock quiz collaborator.

use async_trait::async_trait;

use super::script::{delegate_script, CallScript};
use crate::collaborators::{CollaboratorError, Difficulty, Question, QuizGenerator};
use crate::document::UnitContent;

/// Mock implementation of [`QuizGenerator`]: one question per requested tier.
#[derive(Debug, Default)]
pub struct MockQuizGenerator {
    script: CallScript,
}

impl MockQuizGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_script!(MockQuizGenerator);

#[async_trait]
impl QuizGenerator for MockQuizGenerator {
    fn name(&self) -> &str {
        "mock-quiz"
    }

    async fn generate_quiz(
        &self,
        unit: &UnitContent,
        _narration: &str,
        tiers: &[Difficulty],
    ) -> Result<Vec<Question>, CollaboratorError> {
        self.script.enter(unit.unit_number).await?;
        Ok(tiers
            .iter()
            .map(|tier| Question {
                prompt: format!("What does unit {} cover?", unit.unit_number),
                options: vec!["This".to_string(), "That".to_string()],
                answer_index: 0,
                difficulty: *tier,
                explanation: None,
            })
            .collect())
    }
}
