//! Error types for run lifecycle transitions and parsing.

use super::{RunId, RunStatus};
use thiserror::Error;

/// Errors returned by run lifecycle operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunDomainError {
    /// The requested status transition is not permitted.
    #[error("run {run_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Run being transitioned.
        run_id: RunId,
        /// Current status.
        from: RunStatus,
        /// Requested status.
        to: RunStatus,
    },

    /// A backup run cannot succeed without an artifact path.
    #[error("backup run {0} reported success without an artifact path")]
    MissingArtifactPath(RunId),
}

/// Error returned while parsing run statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown run status: {0}")]
pub struct ParseRunStatusError(pub String);

/// Error returned while parsing trigger kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown run trigger: {0}")]
pub struct ParseTriggerKindError(pub String);
