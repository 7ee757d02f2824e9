//! Mock clip concatenator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collaborators::{ClipConcatenator, CollaboratorError};

/// Mock implementation of [`ClipConcatenator`].
///
/// Records every clip list it is asked to join and returns
/// `artifact://final-<n>.mp4` where `n` is the number of calls so far.
#[derive(Debug, Default)]
pub struct MockConcatenator {
    recorded: Arc<RwLock<Vec<Vec<String>>>>,
    next_error: Arc<RwLock<Option<CollaboratorError>>>,
    validate_error: Arc<RwLock<Option<CollaboratorError>>>,
}

impl MockConcatenator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clip lists in call order.
    pub async fn recorded(&self) -> Vec<Vec<String>> {
        self.recorded.read().await.clone()
    }

    /// The next `concatenate` call fails with `error`.
    pub async fn set_next_error(&self, error: CollaboratorError) {
        *self.next_error.write().await = Some(error);
    }

    /// `validate` fails with `error` until cleared.
    pub async fn set_validate_error(&self, error: Option<CollaboratorError>) {
        *self.validate_error.write().await = error;
    }
}

#[async_trait]
impl ClipConcatenator for MockConcatenator {
    fn name(&self) -> &str {
        "mock-concatenator"
    }

    async fn concatenate(&self, clips: &[String]) -> Result<String, CollaboratorError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        let mut recorded = self.recorded.write().await;
        recorded.push(clips.to_vec());
        Ok(format!("artifact://final-{}.mp4", recorded.len()))
    }

    async fn validate(&self) -> Result<(), CollaboratorError> {
        match self.validate_error.read().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
