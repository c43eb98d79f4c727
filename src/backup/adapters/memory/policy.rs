//! In-memory backup policy repository for tests and single-process use.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backup::{
    domain::{BackupPolicy, BackupPolicyId, HostAddress},
    ports::{BackupPolicyRepository, BackupPolicyRepositoryError, BackupPolicyRepositoryResult},
};

/// Thread-safe in-memory backup policy repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackupPolicyRepository {
    state: Arc<RwLock<HashMap<BackupPolicyId, BackupPolicy>>>,
}

impl InMemoryBackupPolicyRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> BackupPolicyRepositoryError {
    BackupPolicyRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl BackupPolicyRepository for InMemoryBackupPolicyRepository {
    async fn store(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()> {
        let mut policies = self.state.write().map_err(lock_error)?;
        if policies.contains_key(&policy.id()) {
            return Err(BackupPolicyRepositoryError::DuplicatePolicy(policy.id()));
        }
        policies.insert(policy.id(), policy.clone());
        Ok(())
    }

    async fn update(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()> {
        let mut policies = self.state.write().map_err(lock_error)?;
        let stored = policies
            .get_mut(&policy.id())
            .ok_or(BackupPolicyRepositoryError::NotFound(policy.id()))?;
        *stored = policy.clone();
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: BackupPolicyId,
    ) -> BackupPolicyRepositoryResult<Option<BackupPolicy>> {
        let policies = self.state.read().map_err(lock_error)?;
        Ok(policies.get(&id).cloned())
    }

    async fn list(
        &self,
        host: Option<&HostAddress>,
    ) -> BackupPolicyRepositoryResult<Vec<BackupPolicy>> {
        let policies = self.state.read().map_err(lock_error)?;
        let mut live: Vec<BackupPolicy> = policies
            .values()
            .filter(|policy| !policy.is_deleted())
            .filter(|policy| host.is_none_or(|address| policy.host() == address))
            .cloned()
            .collect();
        live.sort_by(|left, right| {
            left.created_at()
                .cmp(&right.created_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(live)
    }
}
