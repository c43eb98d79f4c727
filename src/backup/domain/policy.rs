//! Backup policy aggregate root.

use super::{
    BackupDomainError, BackupPolicyId, CronSchedule, HostAddress, Retention, StorageRepositoryId,
    VmId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Destination storage repository of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRepository {
    /// Hypervisor-side identifier.
    pub id: StorageRepositoryId,
    /// Display name echoed back to clients.
    pub name: String,
}

/// Source virtual machine of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    /// Hypervisor-side identifier.
    pub id: VmId,
    /// Display name.
    pub name: String,
}

/// Validated fields for a new backup policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicyDraft {
    /// Policy name, non-empty.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Destination storage repository.
    pub storage_repository: StorageRepository,
    /// Source VM.
    pub vm: VirtualMachine,
    /// Host running the source VM.
    pub host: HostAddress,
    /// Whether the scheduler should trigger the policy.
    pub active: bool,
    /// Successful backups to keep.
    pub retention: Retention,
    /// Trigger schedule.
    pub schedule: CronSchedule,
}

/// Partial update limited to the mutable policy fields.
///
/// Absent fields are left unchanged. Raw values are validated before any
/// field is written, so a rejected patch leaves the policy untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupPolicyPatch {
    /// New policy name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New five-field cron expression.
    pub cron_schedule: Option<String>,
    /// New retention count.
    pub retention: Option<i64>,
    /// New activation flag.
    pub active: Option<bool>,
}

impl BackupPolicyPatch {
    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the cron expression.
    #[must_use]
    pub fn with_cron_schedule(mut self, cron_schedule: impl Into<String>) -> Self {
        self.cron_schedule = Some(cron_schedule.into());
        self
    }

    /// Sets the retention count.
    #[must_use]
    pub const fn with_retention(mut self, retention: i64) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Sets the activation flag.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
}

/// Backup policy aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPolicy {
    id: BackupPolicyId,
    name: String,
    description: String,
    storage_repository: StorageRepository,
    vm: VirtualMachine,
    host: HostAddress,
    active: bool,
    retention: Retention,
    schedule: CronSchedule,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBackupPolicyData {
    /// Persisted identifier.
    pub id: BackupPolicyId,
    /// Persisted name.
    pub name: String,
    /// Persisted description.
    pub description: String,
    /// Persisted destination storage repository.
    pub storage_repository: StorageRepository,
    /// Persisted source VM.
    pub vm: VirtualMachine,
    /// Persisted host address.
    pub host: HostAddress,
    /// Persisted activation flag.
    pub active: bool,
    /// Persisted retention count.
    pub retention: Retention,
    /// Persisted schedule.
    pub schedule: CronSchedule,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl BackupPolicy {
    /// Creates a new policy from validated fields.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::EmptyPolicyName`] when the name is blank.
    pub fn new(draft: BackupPolicyDraft, clock: &impl Clock) -> Result<Self, BackupDomainError> {
        let name = validated_name(&draft.name)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: BackupPolicyId::new(),
            name,
            description: draft.description.trim().to_owned(),
            storage_repository: draft.storage_repository,
            vm: draft.vm,
            host: draft.host,
            active: draft.active,
            retention: draft.retention,
            schedule: draft.schedule,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        })
    }

    /// Reconstructs a policy from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBackupPolicyData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            description: data.description,
            storage_repository: data.storage_repository,
            vm: data.vm,
            host: data.host,
            active: data.active,
            retention: data.retention,
            schedule: data.schedule,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the policy identifier.
    #[must_use]
    pub const fn id(&self) -> BackupPolicyId {
        self.id
    }

    /// Returns the policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the destination storage repository.
    #[must_use]
    pub const fn storage_repository(&self) -> &StorageRepository {
        &self.storage_repository
    }

    /// Returns the source VM.
    #[must_use]
    pub const fn vm(&self) -> &VirtualMachine {
        &self.vm
    }

    /// Returns the source host address.
    #[must_use]
    pub const fn host(&self) -> &HostAddress {
        &self.host
    }

    /// Returns whether the policy is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the retention count.
    #[must_use]
    pub const fn retention(&self) -> Retention {
        self.retention
    }

    /// Returns the cron schedule.
    #[must_use]
    pub const fn schedule(&self) -> &CronSchedule {
        &self.schedule
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

    /// Returns whether the policy has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns whether the scheduler may trigger this policy.
    #[must_use]
    pub const fn is_schedulable(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }

    /// Applies a partial update to the mutable fields.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::PolicyDeleted`] for deleted policies, or
    /// the validation error of the first invalid field. No field changes when
    /// an error is returned.
    pub fn apply_patch(
        &mut self,
        patch: BackupPolicyPatch,
        clock: &impl Clock,
    ) -> Result<(), BackupDomainError> {
        self.ensure_not_deleted()?;

        let name = patch.name.as_deref().map(validated_name).transpose()?;
        let schedule = patch.cron_schedule.map(CronSchedule::parse).transpose()?;
        let retention = patch.retention.map(Retention::new).transpose()?;

        if let Some(value) = name {
            self.name = value;
        }
        if let Some(value) = patch.description {
            self.description = value.trim().to_owned();
        }
        if let Some(value) = schedule {
            self.schedule = value;
        }
        if let Some(value) = retention {
            self.retention = value;
        }
        if let Some(value) = patch.active {
            self.active = value;
        }
        self.touch(clock);
        Ok(())
    }

    /// Soft-deletes the policy and deactivates it.
    ///
    /// # Errors
    ///
    /// Returns [`BackupDomainError::PolicyDeleted`] when already deleted.
    pub fn mark_deleted(&mut self, clock: &impl Clock) -> Result<(), BackupDomainError> {
        self.ensure_not_deleted()?;
        let timestamp = clock.utc();
        self.active = false;
        self.deleted_at = Some(timestamp);
        self.updated_at = timestamp;
        Ok(())
    }

    const fn ensure_not_deleted(&self) -> Result<(), BackupDomainError> {
        if self.deleted_at.is_some() {
            return Err(BackupDomainError::PolicyDeleted(self.id));
        }
        Ok(())
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

fn validated_name(raw: &str) -> Result<String, BackupDomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BackupDomainError::EmptyPolicyName);
    }
    Ok(trimmed.to_owned())
}
