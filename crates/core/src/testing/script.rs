//! Scripted call behavior shared by the collaborator mocks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore};

use crate::collaborators::CollaboratorError;

#[derive(Debug, Default)]
struct ScriptState {
    calls: Vec<u32>,
    permanent: HashMap<u32, CollaboratorError>,
    transient: HashMap<u32, (u32, CollaboratorError)>,
    delay_ms: u64,
    unit_delays: HashMap<u32, u64>,
    gates: HashMap<u32, Arc<Semaphore>>,
    panics: HashSet<u32>,
}

/// Records calls by unit number and decides how each call behaves.
#[derive(Debug, Clone, Default)]
pub struct CallScript {
    state: Arc<RwLock<ScriptState>>,
}

impl CallScript {
    /// Called at the start of every mocked operation. Records the call,
    /// waits on any gate and delay, then returns the scripted failure if one
    /// applies. Panics for units marked with [`CallScript::panic_unit`].
    pub async fn enter(&self, unit_number: u32) -> Result<(), CollaboratorError> {
        let (gate, delay_ms) = {
            let mut state = self.state.write().await;
            state.calls.push(unit_number);
            let delay = state
                .unit_delays
                .get(&unit_number)
                .copied()
                .unwrap_or(state.delay_ms);
            (state.gates.get(&unit_number).cloned(), delay)
        };

        if let Some(gate) = gate {
            // Closed on release; the error just means "go".
            let _ = gate.acquire().await;
        }
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.state.read().await.panics.contains(&unit_number) {
            panic!("scripted panic for unit {unit_number}");
        }

        let mut state = self.state.write().await;
        if let Some(err) = state.permanent.get(&unit_number) {
            return Err(err.clone());
        }
        if let Some((remaining, err)) = state.transient.get_mut(&unit_number) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(err.clone());
            }
        }
        Ok(())
    }

    pub async fn fail_unit(&self, unit_number: u32, error: CollaboratorError) {
        self.state
            .write()
            .await
            .permanent
            .insert(unit_number, error);
    }

    pub async fn panic_unit(&self, unit_number: u32) {
        self.state.write().await.panics.insert(unit_number);
    }

    pub async fn fail_transiently(&self, unit_number: u32, times: u32, error: CollaboratorError) {
        self.state
            .write()
            .await
            .transient
            .insert(unit_number, (times, error));
    }

    pub async fn set_delay_ms(&self, delay_ms: u64) {
        self.state.write().await.delay_ms = delay_ms;
    }

    pub async fn set_unit_delay_ms(&self, unit_number: u32, delay_ms: u64) {
        self.state
            .write()
            .await
            .unit_delays
            .insert(unit_number, delay_ms);
    }

    /// Calls for `unit_number` wait until [`release_unit`](Self::release_unit).
    pub async fn block_unit(&self, unit_number: u32) {
        self.state
            .write()
            .await
            .gates
            .insert(unit_number, Arc::new(Semaphore::new(0)));
    }

    pub async fn release_unit(&self, unit_number: u32) {
        if let Some(gate) = self.state.write().await.gates.remove(&unit_number) {
            gate.close();
        }
    }

    /// Unit numbers in call order, retries included.
    pub async fn calls(&self) -> Vec<u32> {
        self.state.read().await.calls.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls.len()
    }

    /// Waits until a call for `unit_number` has been recorded.
    pub async fn wait_for_call(&self, unit_number: u32, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state.read().await.calls.contains(&unit_number) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

/// Forwards the scripting API of a mock to its [`CallScript`].
macro_rules! delegate_script {
    ($mock:ty) => {
        impl $mock {
            /// Every call for this unit fails with `error`.
            pub async fn fail_unit(&self, unit_number: u32, error: CollaboratorError) {
                self.script.fail_unit(unit_number, error).await;
            }

            /// Every call for this unit panics.
            pub async fn panic_unit(&self, unit_number: u32) {
                self.script.panic_unit(unit_number).await;
            }

            /// The next `times` calls for this unit fail with `error`.
            pub async fn fail_transiently(
                &self,
                unit_number: u32,
                times: u32,
                error: CollaboratorError,
            ) {
                self.script.fail_transiently(unit_number, times, error).await;
            }

            pub async fn set_delay_ms(&self, delay_ms: u64) {
                self.script.set_delay_ms(delay_ms).await;
            }

            pub async fn set_unit_delay_ms(&self, unit_number: u32, delay_ms: u64) {
                self.script.set_unit_delay_ms(unit_number, delay_ms).await;
            }

            pub async fn block_unit(&self, unit_number: u32) {
                self.script.block_unit(unit_number).await;
            }

            pub async fn release_unit(&self, unit_number: u32) {
                self.script.release_unit(unit_number).await;
            }

            pub async fn calls(&self) -> Vec<u32> {
                self.script.calls().await
            }

            pub async fn call_count(&self) -> usize {
                self.script.call_count().await
            }

            pub async fn wait_for_call(
                &self,
                unit_number: u32,
                timeout: std::time::Duration,
            ) -> bool {
                self.script.wait_for_call(unit_number, timeout).await
            }
        }
    };
}

pub(crate) use delegate_script;
