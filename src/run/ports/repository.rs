//! Repository port for run persistence and history queries.

use crate::backup::domain::BackupPolicyId;
use crate::run::domain::{Run, RunId, RunStatus, RunTarget};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for run repository operations.
pub type RunRepositoryResult<T> = Result<T, RunRepositoryError>;

/// Run persistence contract.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Stores a new run.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::DuplicateRun`] when the run ID already
    /// exists.
    async fn store(&self, run: &Run) -> RunRepositoryResult<()>;

    /// Replaces a non-terminal run with its new state in one write.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::NotFound`] when the run does not exist
    /// and [`RunRepositoryError::TerminalRunImmutable`] when the stored run is
    /// already terminal.
    async fn update(&self, run: &Run) -> RunRepositoryResult<()>;

    /// Finds a run by identifier.
    async fn find_by_id(&self, id: RunId) -> RunRepositoryResult<Option<Run>>;

    /// Lists the runs of a policy or plan ordered by `started_at` ascending.
    async fn list_for_target(&self, target: RunTarget) -> RunRepositoryResult<Vec<Run>>;

    /// Lists the successful backup runs of a policy, newest first.
    ///
    /// Ordering is `completed_at` descending, ties broken by `started_at`
    /// descending and then by run ID descending.
    async fn list_successful_backups(
        &self,
        policy_id: BackupPolicyId,
    ) -> RunRepositoryResult<Vec<Run>>;

    /// Lists every run currently in `status`.
    async fn list_by_status(&self, status: RunStatus) -> RunRepositoryResult<Vec<Run>>;

    /// Deletes a successful backup run.
    ///
    /// # Errors
    ///
    /// Returns [`RunRepositoryError::NotFound`] when the run does not exist
    /// and [`RunRepositoryError::NotPrunable`] when it is not a successful
    /// backup run.
    async fn delete_backup(&self, id: RunId) -> RunRepositoryResult<()>;
}

/// Errors returned by run repository implementations.
#[derive(Debug, Clone, Error)]
pub enum RunRepositoryError {
    /// A run with the same identifier already exists.
    #[error("duplicate run identifier: {0}")]
    DuplicateRun(RunId),

    /// The run was not found.
    #[error("run not found: {0}")]
    NotFound(RunId),

    /// The stored run is terminal and can no longer change.
    #[error("run {0} is terminal and cannot be modified")]
    TerminalRunImmutable(RunId),

    /// Only successful backup runs may be deleted.
    #[error("run {0} is not a successful backup run and cannot be pruned")]
    NotPrunable(RunId),

    /// A stored row could not be turned back into a run.
    #[error("invalid persisted run {id}: {reason}")]
    InvalidPersistedData {
        /// Identifier of the offending row.
        id: RunId,
        /// Validation failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RunRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
