//! Restore plan aggregate root.

use super::{RestoreDomainError, RestorePlanId};
use crate::backup::domain::{BackupPolicyId, HostAddress, StorageRepositoryId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Import flags passed to the hypervisor on every restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    /// Keep the original VM identity (MAC addresses) on import.
    pub preserve: bool,
    /// Start the VM once the import finishes.
    pub power_on_after_restore: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            preserve: true,
            power_on_after_restore: false,
        }
    }
}

/// Partial update limited to the restore flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestorePlanPatch {
    /// New `preserve` flag.
    pub preserve: Option<bool>,
    /// New `power_on_after_restore` flag.
    pub power_on_after_restore: Option<bool>,
}

/// Restore plan aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePlan {
    id: RestorePlanId,
    host: HostAddress,
    storage_repository_id: StorageRepositoryId,
    policy_id: BackupPolicyId,
    options: RestoreOptions,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted restore plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRestorePlanData {
    /// Persisted identifier.
    pub id: RestorePlanId,
    /// Persisted destination host.
    pub host: HostAddress,
    /// Persisted destination storage repository.
    pub storage_repository_id: StorageRepositoryId,
    /// Persisted source policy.
    pub policy_id: BackupPolicyId,
    /// Persisted import flags.
    pub options: RestoreOptions,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl RestorePlan {
    /// Creates a new restore plan.
    #[must_use]
    pub fn new(
        host: HostAddress,
        storage_repository_id: StorageRepositoryId,
        policy_id: BackupPolicyId,
        options: RestoreOptions,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: RestorePlanId::new(),
            host,
            storage_repository_id,
            policy_id,
            options,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        }
    }

    /// Reconstructs a plan from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedRestorePlanData) -> Self {
        Self {
            id: data.id,
            host: data.host,
            storage_repository_id: data.storage_repository_id,
            policy_id: data.policy_id,
            options: data.options,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the plan identifier.
    #[must_use]
    pub const fn id(&self) -> RestorePlanId {
        self.id
    }

    /// Returns the destination host.
    #[must_use]
    pub const fn host(&self) -> &HostAddress {
        &self.host
    }

    /// Returns the destination storage repository.
    #[must_use]
    pub const fn storage_repository_id(&self) -> &StorageRepositoryId {
        &self.storage_repository_id
    }

    /// Returns the policy whose backups are restored.
    #[must_use]
    pub const fn policy_id(&self) -> BackupPolicyId {
        self.policy_id
    }

    /// Returns the import flags.
    #[must_use]
    pub const fn options(&self) -> RestoreOptions {
        self.options
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-deletion timestamp, if deleted.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns whether the plan has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Applies a partial update to the restore flags.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreDomainError::PlanDeleted`] for deleted plans.
    pub fn apply_patch(
        &mut self,
        patch: RestorePlanPatch,
        clock: &impl Clock,
    ) -> Result<(), RestoreDomainError> {
        self.ensure_not_deleted()?;
        if let Some(preserve) = patch.preserve {
            self.options.preserve = preserve;
        }
        if let Some(power_on) = patch.power_on_after_restore {
            self.options.power_on_after_restore = power_on;
        }
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Soft-deletes the plan.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreDomainError::PlanDeleted`] when already deleted.
    pub fn mark_deleted(&mut self, clock: &impl Clock) -> Result<(), RestoreDomainError> {
        self.ensure_not_deleted()?;
        let timestamp = clock.utc();
        self.deleted_at = Some(timestamp);
        self.updated_at = timestamp;
        Ok(())
    }

    const fn ensure_not_deleted(&self) -> Result<(), RestoreDomainError> {
        if self.deleted_at.is_some() {
            return Err(RestoreDomainError::PlanDeleted(self.id));
        }
        Ok(())
    }
}
