//! Response shapes returned by the orchestrator.

use crate::backup::domain::{BackupPolicy, StorageRepository};
use crate::run::domain::{Run, RunId, RunStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A restorable backup of a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupVersion {
    /// Successful backup run.
    pub run_id: RunId,
    /// When the backup finished.
    pub completed_at: DateTime<Utc>,
    /// Artifact location on the host.
    pub backup_path: String,
}

impl BackupVersion {
    /// Builds a version from a successful backup run.
    ///
    /// Returns `None` for any other run.
    #[must_use]
    pub fn from_run(run: &Run) -> Option<Self> {
        if !run.is_successful_backup() {
            return None;
        }
        Some(Self {
            run_id: run.id(),
            completed_at: run.completed_at()?,
            backup_path: run.backup_path()?.to_owned(),
        })
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Terminal status.
    pub status: RunStatus,
    /// Captured gateway output.
    pub output: String,
    /// Artifact written by a successful backup.
    pub artifact_path: Option<String>,
}

impl From<&Run> for RunReport {
    fn from(run: &Run) -> Self {
        Self {
            run_id: run.id(),
            status: run.status(),
            output: run.output_message().to_owned(),
            artifact_path: run.backup_path().map(str::to_owned),
        }
    }
}

/// A newly created policy together with its storage repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPolicy {
    /// Stored policy.
    pub policy: BackupPolicy,
    /// Storage repository receiving the exports.
    pub storage_repository: StorageRepository,
}
