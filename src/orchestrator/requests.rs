//! Run-now request payloads.

use crate::backup::domain::BackupPolicyId;
use crate::restore::domain::RestorePlanId;
use crate::run::domain::RunId;
use serde::{Deserialize, Serialize};

/// Request to back up a policy's VM immediately.
///
/// The optional fields echo what the caller believes the policy targets;
/// when present they must match the stored policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBackupNowRequest {
    /// Policy to run.
    pub policy_id: BackupPolicyId,
    /// Expected host address.
    #[serde(default)]
    pub host: Option<String>,
    /// Expected VM identifier.
    #[serde(default)]
    pub vm_id: Option<String>,
    /// Expected storage repository identifier.
    #[serde(default)]
    pub storage_repository_id: Option<String>,
}

impl RunBackupNowRequest {
    /// Creates a request for `policy_id` without echoed fields.
    #[must_use]
    pub const fn new(policy_id: BackupPolicyId) -> Self {
        Self {
            policy_id,
            host: None,
            vm_id: None,
            storage_repository_id: None,
        }
    }

    /// Sets the expected host address.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the expected VM identifier.
    #[must_use]
    pub fn with_vm_id(mut self, vm_id: impl Into<String>) -> Self {
        self.vm_id = Some(vm_id.into());
        self
    }

    /// Sets the expected storage repository identifier.
    #[must_use]
    pub fn with_storage_repository_id(mut self, storage_repository_id: impl Into<String>) -> Self {
        self.storage_repository_id = Some(storage_repository_id.into());
        self
    }
}

/// Request to restore through a plan immediately.
///
/// Exactly one of `use_latest` and `source_run_id` selects the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRestoreNowRequest {
    /// Plan to run.
    pub plan_id: RestorePlanId,
    /// Restore the newest successful backup.
    #[serde(default = "default_use_latest")]
    pub use_latest: bool,
    /// Restore this specific backup run.
    #[serde(default)]
    pub source_run_id: Option<RunId>,
    /// Expected destination host address.
    #[serde(default)]
    pub host: Option<String>,
    /// Expected destination storage repository identifier.
    #[serde(default)]
    pub storage_repository_id: Option<String>,
}

const fn default_use_latest() -> bool {
    true
}

impl RunRestoreNowRequest {
    /// Creates a request restoring the latest backup through `plan_id`.
    #[must_use]
    pub const fn latest(plan_id: RestorePlanId) -> Self {
        Self {
            plan_id,
            use_latest: true,
            source_run_id: None,
            host: None,
            storage_repository_id: None,
        }
    }

    /// Creates a request restoring `source_run_id` through `plan_id`.
    #[must_use]
    pub const fn from_run(plan_id: RestorePlanId, source_run_id: RunId) -> Self {
        Self {
            plan_id,
            use_latest: false,
            source_run_id: Some(source_run_id),
            host: None,
            storage_repository_id: None,
        }
    }

    /// Sets the expected destination host address.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the expected destination storage repository identifier.
    #[must_use]
    pub fn with_storage_repository_id(mut self, storage_repository_id: impl Into<String>) -> Self {
        self.storage_repository_id = Some(storage_repository_id.into());
        self
    }
}
