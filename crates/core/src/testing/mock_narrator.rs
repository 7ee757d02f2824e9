//! Mock narration collaborator.

use async_trait::async_trait;

use super::script::{delegate_script, CallScript};
use crate::collaborators::{CollaboratorError, NarrationGenerator, StyleConfig};
use crate::document::UnitContent;

/// Mock implementation of [`NarrationGenerator`].
///
/// Returns `"Narration (<language>): <text>"` unless scripted otherwise.
///
/// ```rust,ignore
/// let narrator = MockNarrator::new();
/// narrator.fail_unit(2, CollaboratorError::permanent("unreadable")).await;
/// narrator.fail_transiently(3, 1, CollaboratorError::transient("503")).await;
/// ```
#[derive(Debug, Default)]
pub struct MockNarrator {
    script: CallScript,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_script!(MockNarrator);

#[async_trait]
impl NarrationGenerator for MockNarrator {
    fn name(&self) -> &str {
        "mock-narrator"
    }

    async fn generate_narration(
        &self,
        unit: &UnitContent,
        language: &str,
        _style: &StyleConfig,
    ) -> Result<String, CollaboratorError> {
        self.script.enter(unit.unit_number).await?;
        Ok(format!("Narration ({language}): {}", unit.text.trim()))
    }
}
