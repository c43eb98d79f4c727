//! Repository port for backup policy persistence and lookup.

use crate::backup::domain::{BackupPolicy, BackupPolicyId, HostAddress};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for backup policy repository operations.
pub type BackupPolicyRepositoryResult<T> = Result<T, BackupPolicyRepositoryError>;

/// Backup policy persistence contract.
#[async_trait]
pub trait BackupPolicyRepository: Send + Sync {
    /// Stores a new policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyRepositoryError::DuplicatePolicy`] when the
    /// policy ID already exists.
    async fn store(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()>;

    /// Persists changes to an existing policy, including soft deletion.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyRepositoryError::NotFound`] when the policy does
    /// not exist.
    async fn update(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()>;

    /// Finds a policy by identifier, including soft-deleted policies.
    ///
    /// Returns `None` when the policy does not exist.
    async fn find_by_id(
        &self,
        id: BackupPolicyId,
    ) -> BackupPolicyRepositoryResult<Option<BackupPolicy>>;

    /// Lists live policies ordered by creation time, optionally restricted to
    /// one host.
    async fn list(
        &self,
        host: Option<&HostAddress>,
    ) -> BackupPolicyRepositoryResult<Vec<BackupPolicy>>;
}

/// Errors returned by backup policy repository implementations.
#[derive(Debug, Clone, Error)]
pub enum BackupPolicyRepositoryError {
    /// A policy with the same identifier already exists.
    #[error("duplicate backup policy identifier: {0}")]
    DuplicatePolicy(BackupPolicyId),

    /// The policy was not found.
    #[error("backup policy not found: {0}")]
    NotFound(BackupPolicyId),

    /// A stored row could not be turned back into a policy.
    #[error("invalid persisted backup policy {id}: {reason}")]
    InvalidPersistedData {
        /// Identifier of the offending row.
        id: BackupPolicyId,
        /// Validation failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl BackupPolicyRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
