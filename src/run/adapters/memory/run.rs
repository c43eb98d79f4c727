//! In-memory run repository for tests and single-process use.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backup::domain::BackupPolicyId;
use crate::run::{
    domain::{Run, RunId, RunStatus, RunTarget},
    ports::{RunRepository, RunRepositoryError, RunRepositoryResult},
};

/// Thread-safe in-memory run repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRunRepository {
    state: Arc<RwLock<HashMap<RunId, Run>>>,
}

impl InMemoryRunRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> RunRepositoryError {
    RunRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Newest-first ordering used for retention and latest-source resolution.
fn newest_first(left: &Run, right: &Run) -> Ordering {
    right
        .completed_at()
        .cmp(&left.completed_at())
        .then_with(|| right.started_at().cmp(&left.started_at()))
        .then_with(|| right.id().cmp(&left.id()))
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn store(&self, run: &Run) -> RunRepositoryResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        if runs.contains_key(&run.id()) {
            return Err(RunRepositoryError::DuplicateRun(run.id()));
        }
        runs.insert(run.id(), run.clone());
        Ok(())
    }

    async fn update(&self, run: &Run) -> RunRepositoryResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        let stored = runs
            .get_mut(&run.id())
            .ok_or(RunRepositoryError::NotFound(run.id()))?;
        if stored.status().is_terminal() {
            return Err(RunRepositoryError::TerminalRunImmutable(run.id()));
        }
        *stored = run.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: RunId) -> RunRepositoryResult<Option<Run>> {
        let runs = self.state.read().map_err(lock_error)?;
        Ok(runs.get(&id).cloned())
    }

    async fn list_for_target(&self, target: RunTarget) -> RunRepositoryResult<Vec<Run>> {
        let runs = self.state.read().map_err(lock_error)?;
        let mut matching: Vec<Run> = runs
            .values()
            .filter(|run| run.target() == target)
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            left.started_at()
                .cmp(&right.started_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(matching)
    }

    async fn list_successful_backups(
        &self,
        policy_id: BackupPolicyId,
    ) -> RunRepositoryResult<Vec<Run>> {
        let runs = self.state.read().map_err(lock_error)?;
        let mut successes: Vec<Run> = runs
            .values()
            .filter(|run| run.is_successful_backup() && run.policy_id() == Some(policy_id))
            .cloned()
            .collect();
        successes.sort_by(newest_first);
        Ok(successes)
    }

    async fn list_by_status(&self, status: RunStatus) -> RunRepositoryResult<Vec<Run>> {
        let runs = self.state.read().map_err(lock_error)?;
        Ok(runs
            .values()
            .filter(|run| run.status() == status)
            .cloned()
            .collect())
    }

    async fn delete_backup(&self, id: RunId) -> RunRepositoryResult<()> {
        let mut runs = self.state.write().map_err(lock_error)?;
        let run = runs.get(&id).ok_or(RunRepositoryError::NotFound(id))?;
        if !run.is_successful_backup() {
            return Err(RunRepositoryError::NotPrunable(id));
        }
        runs.remove(&id);
        Ok(())
    }
}
