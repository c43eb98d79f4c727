//! Creation, lookup, update and soft deletion of backup policies.

use crate::backup::{
    domain::{
        BackupDomainError, BackupPolicy, BackupPolicyDraft, BackupPolicyId, BackupPolicyPatch,
        CronSchedule, HostAddress, Retention, StorageRepository, StorageRepositoryId,
        VirtualMachine, VmId,
    },
    ports::{BackupPolicyRepository, BackupPolicyRepositoryError},
};
use crate::host::{HostDirectory, HostDirectoryError};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Request payload for creating a backup policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBackupPolicyRequest {
    name: String,
    description: String,
    host: String,
    vm_id: String,
    vm_name: Option<String>,
    storage_repository_id: String,
    storage_repository_name: Option<String>,
    cron_schedule: String,
    retention: i64,
    active: bool,
}

impl CreateBackupPolicyRequest {
    /// Creates a request with the required policy fields.
    ///
    /// The policy is active unless [`Self::with_active`] says otherwise.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        vm_id: impl Into<String>,
        storage_repository_id: impl Into<String>,
        cron_schedule: impl Into<String>,
        retention: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            host: host.into(),
            vm_id: vm_id.into(),
            vm_name: None,
            storage_repository_id: storage_repository_id.into(),
            storage_repository_name: None,
            cron_schedule: cron_schedule.into(),
            retention,
            active: true,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the VM display name.
    #[must_use]
    pub fn with_vm_name(mut self, vm_name: impl Into<String>) -> Self {
        self.vm_name = Some(vm_name.into());
        self
    }

    /// Sets the storage repository display name.
    #[must_use]
    pub fn with_storage_repository_name(mut self, name: impl Into<String>) -> Self {
        self.storage_repository_name = Some(name.into());
        self
    }

    /// Sets the initial activation flag.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    fn into_draft(self) -> Result<BackupPolicyDraft, BackupDomainError> {
        let vm_id = VmId::new(self.vm_id)?;
        let storage_repository_id = StorageRepositoryId::new(self.storage_repository_id)?;
        let vm_name = self.vm_name.unwrap_or_else(|| vm_id.as_str().to_owned());
        let storage_repository_name = self
            .storage_repository_name
            .unwrap_or_else(|| storage_repository_id.as_str().to_owned());

        Ok(BackupPolicyDraft {
            name: self.name,
            description: self.description,
            storage_repository: StorageRepository {
                id: storage_repository_id,
                name: storage_repository_name,
            },
            vm: VirtualMachine {
                id: vm_id,
                name: vm_name,
            },
            host: HostAddress::new(self.host)?,
            active: self.active,
            retention: Retention::new(self.retention)?,
            schedule: CronSchedule::parse(self.cron_schedule)?,
        })
    }
}

/// Service-level errors for backup policy catalog operations.
#[derive(Debug, Error)]
pub enum BackupPolicyCatalogError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] BackupDomainError),
    /// The referenced host is not registered.
    #[error("unknown host: {0}")]
    UnknownHost(HostAddress),
    /// The policy does not exist or has been deleted.
    #[error("backup policy not found: {0}")]
    NotFound(BackupPolicyId),
    /// Host lookup failed.
    #[error(transparent)]
    HostDirectory(#[from] HostDirectoryError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] BackupPolicyRepositoryError),
}

/// Result type for backup policy catalog operations.
pub type BackupPolicyCatalogResult<T> = Result<T, BackupPolicyCatalogError>;

/// Backup policy catalog service.
pub struct BackupPolicyService<R, H, C>
where
    R: BackupPolicyRepository,
    H: HostDirectory,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    hosts: Arc<H>,
    clock: Arc<C>,
}

impl<R, H, C> Clone for BackupPolicyService<R, H, C>
where
    R: BackupPolicyRepository,
    H: HostDirectory,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            hosts: Arc::clone(&self.hosts),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, H, C> BackupPolicyService<R, H, C>
where
    R: BackupPolicyRepository,
    H: HostDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a new catalog service.
    #[must_use]
    pub const fn new(repository: Arc<R>, hosts: Arc<H>, clock: Arc<C>) -> Self {
        Self {
            repository,
            hosts,
            clock,
        }
    }

    /// Validates and stores a new policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyCatalogError::Domain`] for invalid fields,
    /// [`BackupPolicyCatalogError::UnknownHost`] when the host is not
    /// registered, or a repository error when persistence fails.
    pub async fn create(
        &self,
        request: CreateBackupPolicyRequest,
    ) -> BackupPolicyCatalogResult<BackupPolicy> {
        let draft = request.into_draft()?;
        if !self.hosts.contains(&draft.host).await? {
            return Err(BackupPolicyCatalogError::UnknownHost(draft.host));
        }

        let policy = BackupPolicy::new(draft, &*self.clock)?;
        self.repository.store(&policy).await?;
        info!(
            policy_id = %policy.id(),
            host = %policy.host(),
            schedule = %policy.schedule(),
            "backup policy created"
        );
        Ok(policy)
    }

    /// Returns a live policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyCatalogError::NotFound`] when the policy does not
    /// exist or has been deleted.
    pub async fn get(&self, id: BackupPolicyId) -> BackupPolicyCatalogResult<BackupPolicy> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|policy| !policy.is_deleted())
            .ok_or(BackupPolicyCatalogError::NotFound(id))
    }

    /// Returns a policy even when it has been soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyCatalogError::NotFound`] when no row exists.
    pub async fn get_including_deleted(
        &self,
        id: BackupPolicyId,
    ) -> BackupPolicyCatalogResult<BackupPolicy> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(BackupPolicyCatalogError::NotFound(id))
    }

    /// Lists live policies, optionally for one host.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn list(
        &self,
        host: Option<&HostAddress>,
    ) -> BackupPolicyCatalogResult<Vec<BackupPolicy>> {
        Ok(self.repository.list(host).await?)
    }

    /// Applies a partial update to a live policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyCatalogError::NotFound`] for unknown or deleted
    /// policies and [`BackupPolicyCatalogError::Domain`] for invalid fields.
    pub async fn update(
        &self,
        id: BackupPolicyId,
        patch: BackupPolicyPatch,
    ) -> BackupPolicyCatalogResult<BackupPolicy> {
        let mut policy = self.get(id).await?;
        policy.apply_patch(patch, &*self.clock)?;
        self.repository.update(&policy).await?;
        info!(
            policy_id = %policy.id(),
            active = policy.is_active(),
            schedule = %policy.schedule(),
            retention = %policy.retention(),
            "backup policy updated"
        );
        Ok(policy)
    }

    /// Soft-deletes a live policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackupPolicyCatalogError::NotFound`] for unknown or already
    /// deleted policies.
    pub async fn mark_deleted(&self, id: BackupPolicyId) -> BackupPolicyCatalogResult<BackupPolicy> {
        let mut policy = self.get(id).await?;
        policy.mark_deleted(&*self.clock)?;
        self.repository.update(&policy).await?;
        info!(policy_id = %policy.id(), "backup policy deleted");
        Ok(policy)
    }
}
