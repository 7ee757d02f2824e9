//! Mock render/synthesis collaborator.

use async_trait::async_trait;

use super::script::{delegate_script, CallScript};
use crate::collaborators::{CollaboratorError, RenderOutput, UnitRenderer};
use crate::document::UnitContent;

/// Mock implementation of [`UnitRenderer`] producing
/// `image://unit-N`, `audio://unit-N` and `clip://unit-N`.
#[derive(Debug, Default)]
pub struct MockRenderer {
    script: CallScript,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_script!(MockRenderer);

#[async_trait]
impl UnitRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock-renderer"
    }

    async fn render_unit(
        &self,
        unit: &UnitContent,
        _narration: &str,
    ) -> Result<RenderOutput, CollaboratorError> {
        self.script.enter(unit.unit_number).await?;
        let n = unit.unit_number;
        Ok(RenderOutput {
            image_ref: format!("image://unit-{n}"),
            audio_ref: format!("audio://unit-{n}"),
            clip_ref: format!("clip://unit-{n}"),
        })
    }
}
