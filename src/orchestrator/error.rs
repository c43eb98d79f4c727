//! Caller-visible error taxonomy.

use crate::backup::domain::{BackupDomainError, BackupPolicyId, HostAddress};
use crate::backup::ports::BackupPolicyRepositoryError;
use crate::backup::services::BackupPolicyCatalogError;
use crate::executor::services::JobExecutorError;
use crate::restore::domain::{
    InvalidSourceReason, ResolveSourceError, RestoreDomainError, RestorePlanId,
};
use crate::restore::ports::RestorePlanRepositoryError;
use crate::restore::services::RestorePlanCatalogError;
use crate::run::domain::{RunId, RunTarget};
use crate::run::ports::RunRepositoryError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Coarse error category, for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or inconsistent request.
    Validation,
    /// Target already has a run in flight.
    Conflict,
    /// Referenced entity does not exist.
    NotFound,
    /// Explicit restore source cannot be used.
    InvalidReference,
    /// Storage or host lookup failure.
    Persistence,
    /// Unexpected engine failure.
    Internal,
}

/// Request rejected before any state changed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A field failed domain validation.
    #[error(transparent)]
    Field(#[from] BackupDomainError),
    /// The restore source selection is missing or ambiguous.
    #[error(transparent)]
    Selection(#[from] RestoreDomainError),
    /// The host is not registered.
    #[error("unknown host {0}")]
    UnknownHost(HostAddress),
    /// A restore plan references a missing or deleted backup policy.
    #[error("unknown backup policy {0}")]
    UnknownPolicy(BackupPolicyId),
    /// A run-now request disagrees with the stored policy or plan.
    #[error("{field} mismatch: stored '{stored}', requested '{requested}'")]
    Mismatch {
        /// Field name.
        field: &'static str,
        /// Value recorded on the policy or plan.
        stored: String,
        /// Value supplied by the caller.
        requested: String,
    },
}

/// Entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntity {
    /// Backup policy.
    Policy(BackupPolicyId),
    /// Restore plan.
    Plan(RestorePlanId),
    /// Run record.
    Run(RunId),
    /// Successful backup of a policy.
    SuccessfulBackup(BackupPolicyId),
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(id) => write!(f, "backup policy {id}"),
            Self::Plan(id) => write!(f, "restore plan {id}"),
            Self::Run(id) => write!(f, "run {id}"),
            Self::SuccessfulBackup(id) => write!(f, "successful backup of policy {id}"),
        }
    }
}

/// Errors returned by [`super::Orchestrator`] operations.
///
/// Gateway failures never appear here; they are recorded as failed runs.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// The request is malformed or inconsistent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// The target already has a run in flight.
    #[error("{0} already has a run in progress")]
    Conflict(RunTarget),
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(MissingEntity),
    /// The explicit restore source cannot be used.
    #[error("run {run_id} cannot be restored: {reason}")]
    InvalidReference {
        /// Requested source run.
        run_id: RunId,
        /// Rejection reason.
        reason: InvalidSourceReason,
    },
    /// A repository or host directory call failed.
    #[error("persistence failure: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
    /// The engine reached a state it could not handle.
    #[error("internal error: {0}")]
    Internal(Arc<dyn std::error::Error + Send + Sync>),
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl OrchestratorError {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidReference { .. } => ErrorKind::InvalidReference,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(Arc::new(err))
    }
}

impl From<BackupPolicyRepositoryError> for OrchestratorError {
    fn from(err: BackupPolicyRepositoryError) -> Self {
        match err {
            BackupPolicyRepositoryError::NotFound(id) => Self::NotFound(MissingEntity::Policy(id)),
            other => Self::persistence(other),
        }
    }
}

impl From<RestorePlanRepositoryError> for OrchestratorError {
    fn from(err: RestorePlanRepositoryError) -> Self {
        match err {
            RestorePlanRepositoryError::NotFound(id) => Self::NotFound(MissingEntity::Plan(id)),
            other => Self::persistence(other),
        }
    }
}

impl From<RunRepositoryError> for OrchestratorError {
    fn from(err: RunRepositoryError) -> Self {
        match err {
            RunRepositoryError::NotFound(id) => Self::NotFound(MissingEntity::Run(id)),
            other => Self::persistence(other),
        }
    }
}

impl From<BackupPolicyCatalogError> for OrchestratorError {
    fn from(err: BackupPolicyCatalogError) -> Self {
        match err {
            BackupPolicyCatalogError::Domain(BackupDomainError::PolicyDeleted(id))
            | BackupPolicyCatalogError::NotFound(id) => Self::NotFound(MissingEntity::Policy(id)),
            BackupPolicyCatalogError::Domain(domain) => ValidationError::Field(domain).into(),
            BackupPolicyCatalogError::UnknownHost(host) => ValidationError::UnknownHost(host).into(),
            BackupPolicyCatalogError::HostDirectory(directory) => Self::persistence(directory),
            BackupPolicyCatalogError::Repository(repository) => repository.into(),
        }
    }
}

impl From<RestorePlanCatalogError> for OrchestratorError {
    fn from(err: RestorePlanCatalogError) -> Self {
        match err {
            RestorePlanCatalogError::Domain(RestoreDomainError::PlanDeleted(id))
            | RestorePlanCatalogError::NotFound(id) => Self::NotFound(MissingEntity::Plan(id)),
            RestorePlanCatalogError::Domain(domain) => ValidationError::Selection(domain).into(),
            RestorePlanCatalogError::InvalidField(field) => ValidationError::Field(field).into(),
            RestorePlanCatalogError::UnknownHost(host) => ValidationError::UnknownHost(host).into(),
            RestorePlanCatalogError::UnknownPolicy(id) => ValidationError::UnknownPolicy(id).into(),
            RestorePlanCatalogError::HostDirectory(directory) => Self::persistence(directory),
            RestorePlanCatalogError::PolicyRepository(repository) => repository.into(),
            RestorePlanCatalogError::Repository(repository) => repository.into(),
        }
    }
}

impl From<JobExecutorError> for OrchestratorError {
    fn from(err: JobExecutorError) -> Self {
        match err {
            JobExecutorError::Conflict(target) => Self::Conflict(target),
            JobExecutorError::Resolve(ResolveSourceError::NoSuccessfulBackup(policy_id)) => {
                Self::NotFound(MissingEntity::SuccessfulBackup(policy_id))
            }
            JobExecutorError::Resolve(ResolveSourceError::InvalidReference { run_id, reason }) => {
                Self::InvalidReference { run_id, reason }
            }
            JobExecutorError::Repository(repository) => repository.into(),
            other @ (JobExecutorError::Domain(_) | JobExecutorError::Aborted { .. }) => {
                Self::internal(other)
            }
        }
    }
}
