//! Supervised execution of inputs.
//!
//! Each configured input runs on its own tokio task under an [`InputRunner`].
//! The runner's job is fault containment: a panic inside third-party input
//! logic must not take down the process or sibling inputs. The run future
//! executes on a nested task so the panic is caught at the task boundary;
//! the supervising task logs it and completes its lifecycle bookkeeping as
//! if the input had exited cleanly.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{error, info};

use crate::input::{Input, InputHelper};
use crate::pack::PackSupply;

/// Runs one input on an isolated task and contains its faults.
#[derive(Clone)]
pub struct InputRunner {
    name: Arc<str>,
    input: Arc<dyn Input>,
    supply: PackSupply,
}

impl InputRunner {
    pub fn new(name: impl Into<String>, input: Arc<dyn Input>, supply: PackSupply) -> Self {
        InputRunner { name: name.into().into(), input, supply }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The buffer supply this input draws from.
    pub fn pack_supply(&self) -> &PackSupply {
        &self.supply
    }

    /// Start the input's run loop on its own task.
    ///
    /// Returns immediately; `tracker` completes once the input has stopped,
    /// whether it exited cleanly, failed, or panicked. A panic never escapes
    /// this call or the tracker.
    pub fn start(&self, helper: InputHelper, tracker: &TaskTracker) {
        let runner = self.clone();
        tracker.spawn(async move {
            let name = Arc::clone(&runner.name);
            let input = Arc::clone(&runner.input);
            let handle = tokio::spawn(async move { input.run(&runner, &helper).await });
            match handle.await {
                Ok(Ok(())) => info!(input = %name, "input stopped"),
                Ok(Err(err)) => error!(input = %name, error = %err, "input failed"),
                Err(join_err) if join_err.is_panic() => {
                    let payload = join_err.into_panic();
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "opaque panic payload".to_string());
                    error!(input = %name, panic = %message, "input panicked, treating as stopped");
                }
                Err(_) => info!(input = %name, "input task cancelled"),
            }
        });
    }

    /// Ask the input to wind down.
    pub fn stop(&self) {
        self.input.stop();
    }
}
