//! Error types for restore plans and source resolution.

use super::RestorePlanId;
use crate::backup::domain::BackupPolicyId;
use crate::run::domain::{RunId, RunStatus};
use std::fmt;
use thiserror::Error;

/// Errors returned while constructing or mutating restore plans.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RestoreDomainError {
    /// The plan has been deleted and can no longer change.
    #[error("restore plan {0} has been deleted")]
    PlanDeleted(RestorePlanId),

    /// Neither the latest backup nor an explicit source run was requested.
    #[error("a restore needs either the latest backup or an explicit source run")]
    MissingSourceRun,

    /// Both the latest backup and an explicit source run were requested.
    #[error("choose either the latest backup or source run {0}, not both")]
    AmbiguousSourceSelection(RunId),
}

/// Why an explicit source run cannot be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidSourceReason {
    /// No run with the identifier exists.
    Missing,
    /// The run is a restore run.
    NotBackup,
    /// The run belongs to another policy.
    ForeignPolicy,
    /// The run did not finish successfully.
    NotSuccessful(RunStatus),
    /// The run succeeded but has no recorded artifact.
    MissingArtifact,
}

impl fmt::Display for InvalidSourceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("run does not exist"),
            Self::NotBackup => f.write_str("run is not a backup run"),
            Self::ForeignPolicy => f.write_str("run belongs to a different backup policy"),
            Self::NotSuccessful(status) => write!(f, "run status is {status}, not success"),
            Self::MissingArtifact => f.write_str("run has no recorded artifact"),
        }
    }
}

/// Errors returned by [`super::resolve_source`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveSourceError {
    /// The policy has no successful backup to restore from.
    #[error("backup policy {0} has no successful backup")]
    NoSuccessfulBackup(BackupPolicyId),

    /// The explicitly requested run cannot serve as a restore source.
    #[error("run {run_id} cannot be restored: {reason}")]
    InvalidReference {
        /// Requested source run.
        run_id: RunId,
        /// Rejection reason.
        reason: InvalidSourceReason,
    },
}
