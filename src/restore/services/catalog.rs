//! Creation, lookup, update and soft deletion of restore plans.

use crate::backup::{
    domain::{BackupDomainError, BackupPolicyId, HostAddress, StorageRepositoryId},
    ports::{BackupPolicyRepository, BackupPolicyRepositoryError},
};
use crate::host::{HostDirectory, HostDirectoryError};
use crate::restore::{
    domain::{RestoreDomainError, RestoreOptions, RestorePlan, RestorePlanId, RestorePlanPatch},
    ports::{RestorePlanRepository, RestorePlanRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Request payload for creating a restore plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRestorePlanRequest {
    host: String,
    storage_repository_id: String,
    policy_id: BackupPolicyId,
    options: RestoreOptions,
}

impl CreateRestorePlanRequest {
    /// Creates a request with default import flags (preserve, no power-on).
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        storage_repository_id: impl Into<String>,
        policy_id: BackupPolicyId,
    ) -> Self {
        Self {
            host: host.into(),
            storage_repository_id: storage_repository_id.into(),
            policy_id,
            options: RestoreOptions::default(),
        }
    }

    /// Sets the `preserve` flag.
    #[must_use]
    pub const fn with_preserve(mut self, preserve: bool) -> Self {
        self.options.preserve = preserve;
        self
    }

    /// Sets the `power_on_after_restore` flag.
    #[must_use]
    pub const fn with_power_on_after_restore(mut self, power_on: bool) -> Self {
        self.options.power_on_after_restore = power_on;
        self
    }
}

/// Service-level errors for restore plan catalog operations.
#[derive(Debug, Error)]
pub enum RestorePlanCatalogError {
    /// A host or storage identifier is malformed.
    #[error(transparent)]
    InvalidField(#[from] BackupDomainError),
    /// Plan state forbids the change.
    #[error(transparent)]
    Domain(#[from] RestoreDomainError),
    /// The destination host is not registered.
    #[error("unknown host: {0}")]
    UnknownHost(HostAddress),
    /// The source policy does not exist or has been deleted.
    #[error("unknown backup policy: {0}")]
    UnknownPolicy(BackupPolicyId),
    /// The plan does not exist or has been deleted.
    #[error("restore plan not found: {0}")]
    NotFound(RestorePlanId),
    /// Host lookup failed.
    #[error(transparent)]
    HostDirectory(#[from] HostDirectoryError),
    /// Policy lookup failed.
    #[error(transparent)]
    PolicyRepository(#[from] BackupPolicyRepositoryError),
    /// Plan repository operation failed.
    #[error(transparent)]
    Repository(#[from] RestorePlanRepositoryError),
}

/// Result type for restore plan catalog operations.
pub type RestorePlanCatalogResult<T> = Result<T, RestorePlanCatalogError>;

/// Restore plan catalog service.
pub struct RestorePlanService<R, P, H, C>
where
    R: RestorePlanRepository,
    P: BackupPolicyRepository,
    H: HostDirectory,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    policies: Arc<P>,
    hosts: Arc<H>,
    clock: Arc<C>,
}

impl<R, P, H, C> Clone for RestorePlanService<R, P, H, C>
where
    R: RestorePlanRepository,
    P: BackupPolicyRepository,
    H: HostDirectory,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            policies: Arc::clone(&self.policies),
            hosts: Arc::clone(&self.hosts),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, P, H, C> RestorePlanService<R, P, H, C>
where
    R: RestorePlanRepository,
    P: BackupPolicyRepository,
    H: HostDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a new catalog service.
    #[must_use]
    pub const fn new(repository: Arc<R>, policies: Arc<P>, hosts: Arc<H>, clock: Arc<C>) -> Self {
        Self {
            repository,
            policies,
            hosts,
            clock,
        }
    }

    /// Validates and stores a new restore plan.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePlanCatalogError::UnknownHost`] or
    /// [`RestorePlanCatalogError::UnknownPolicy`] for dangling references and
    /// [`RestorePlanCatalogError::InvalidField`] for malformed identifiers.
    pub async fn create(
        &self,
        request: CreateRestorePlanRequest,
    ) -> RestorePlanCatalogResult<RestorePlan> {
        let host = HostAddress::new(request.host)?;
        let storage_repository_id = StorageRepositoryId::new(request.storage_repository_id)?;
        if !self.hosts.contains(&host).await? {
            return Err(RestorePlanCatalogError::UnknownHost(host));
        }
        let policy_live = self
            .policies
            .find_by_id(request.policy_id)
            .await?
            .is_some_and(|policy| !policy.is_deleted());
        if !policy_live {
            return Err(RestorePlanCatalogError::UnknownPolicy(request.policy_id));
        }

        let plan = RestorePlan::new(
            host,
            storage_repository_id,
            request.policy_id,
            request.options,
            &*self.clock,
        );
        self.repository.store(&plan).await?;
        info!(
            plan_id = %plan.id(),
            policy_id = %plan.policy_id(),
            host = %plan.host(),
            "restore plan created"
        );
        Ok(plan)
    }

    /// Returns a live plan.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePlanCatalogError::NotFound`] when the plan does not
    /// exist or has been deleted.
    pub async fn get(&self, id: RestorePlanId) -> RestorePlanCatalogResult<RestorePlan> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|plan| !plan.is_deleted())
            .ok_or(RestorePlanCatalogError::NotFound(id))
    }

    /// Lists live plans.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    pub async fn list(&self) -> RestorePlanCatalogResult<Vec<RestorePlan>> {
        Ok(self.repository.list().await?)
    }

    /// Updates the restore flags of a live plan.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePlanCatalogError::NotFound`] for unknown or deleted
    /// plans.
    pub async fn update(
        &self,
        id: RestorePlanId,
        patch: RestorePlanPatch,
    ) -> RestorePlanCatalogResult<RestorePlan> {
        let mut plan = self.get(id).await?;
        plan.apply_patch(patch, &*self.clock)?;
        self.repository.update(&plan).await?;
        info!(plan_id = %plan.id(), "restore plan updated");
        Ok(plan)
    }

    /// Soft-deletes a live plan.
    ///
    /// # Errors
    ///
    /// Returns [`RestorePlanCatalogError::NotFound`] for unknown or already
    /// deleted plans.
    pub async fn mark_deleted(&self, id: RestorePlanId) -> RestorePlanCatalogResult<RestorePlan> {
        let mut plan = self.get(id).await?;
        plan.mark_deleted(&*self.clock)?;
        self.repository.update(&plan).await?;
        info!(plan_id = %plan.id(), "restore plan deleted");
        Ok(plan)
    }
}
