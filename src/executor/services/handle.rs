//! Handle on a submitted run.

use super::JobExecutorError;
use crate::run::domain::{Run, RunId, RunTarget};
use tokio::task::JoinHandle;

/// Handle returned when a run has been accepted.
///
/// The run row already exists in `running` state. Awaiting [`Self::wait`]
/// yields the terminal run; dropping the handle leaves the run executing.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    target: RunTarget,
    task: JoinHandle<Run>,
}

impl RunHandle {
    pub(crate) const fn new(run_id: RunId, target: RunTarget, task: JoinHandle<Run>) -> Self {
        Self {
            run_id,
            target,
            task,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Returns the policy or plan the run belongs to.
    #[must_use]
    pub const fn target(&self) -> RunTarget {
        self.target
    }

    /// Waits for the run to reach a terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`JobExecutorError::Aborted`] when the execution task panicked
    /// or was cancelled by runtime shutdown.
    pub async fn wait(self) -> Result<Run, JobExecutorError> {
        let run_id = self.run_id;
        self.task
            .await
            .map_err(|err| JobExecutorError::Aborted {
                run_id,
                reason: err.to_string(),
            })
    }
}
