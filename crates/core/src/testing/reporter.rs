//! Stage reporter that just records updates.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::processor::{StageReporter, StageUpdate};

#[derive(Debug, Default)]
pub struct RecordingReporter {
    updates: Mutex<Vec<StageUpdate>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StageUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl StageReporter for RecordingReporter {
    async fn report(&self, update: StageUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(update);
    }
}
