//! Error types for backup policy validation.

use super::BackupPolicyId;
use thiserror::Error;

/// Errors returned while constructing or mutating backup policies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackupDomainError {
    /// The policy name is empty after trimming.
    #[error("backup policy name must not be empty")]
    EmptyPolicyName,

    /// The host address is empty or contains whitespace.
    #[error("invalid host address '{0}'")]
    InvalidHostAddress(String),

    /// The storage repository identifier is empty or contains whitespace.
    #[error("invalid storage repository identifier '{0}'")]
    InvalidStorageRepositoryId(String),

    /// The VM identifier is empty or contains whitespace.
    #[error("invalid VM identifier '{0}'")]
    InvalidVmId(String),

    /// The cron schedule is not a valid five-field expression.
    #[error("invalid cron schedule '{expression}': {reason}")]
    InvalidCronSchedule {
        /// Expression as supplied.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Retention is below one or above the supported maximum.
    #[error("invalid retention {0}, expected an integer of at least 1")]
    InvalidRetention(i64),

    /// The policy has been deleted and can no longer change.
    #[error("backup policy {0} has been deleted")]
    PolicyDeleted(BackupPolicyId),
}
