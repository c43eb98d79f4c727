//! Mapping of a restore request onto one prior backup run.

use super::{InvalidSourceReason, ResolveSourceError, RestoreDomainError};
use crate::backup::domain::BackupPolicyId;
use crate::run::domain::{Run, RunId, RunStatus};

/// Which backup run a restore should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    /// The most recently completed successful backup.
    Latest,
    /// A specific backup run.
    Explicit(RunId),
}

impl SourceSelection {
    /// Builds a selection from the request flags.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreDomainError::MissingSourceRun`] when neither option
    /// is given and [`RestoreDomainError::AmbiguousSourceSelection`] when
    /// both are.
    pub const fn from_request(
        use_latest: bool,
        source_run_id: Option<RunId>,
    ) -> Result<Self, RestoreDomainError> {
        match (use_latest, source_run_id) {
            (true, None) => Ok(Self::Latest),
            (false, Some(run_id)) => Ok(Self::Explicit(run_id)),
            (true, Some(run_id)) => Err(RestoreDomainError::AmbiguousSourceSelection(run_id)),
            (false, None) => Err(RestoreDomainError::MissingSourceRun),
        }
    }
}

/// Selects the backup run a restore of `policy_id` should read from.
///
/// `runs` may contain any runs; only successful backup runs of `policy_id`
/// qualify. `Latest` picks the maximum `completed_at`, breaking ties by
/// `started_at` and then run ID.
///
/// # Errors
///
/// Returns [`ResolveSourceError::NoSuccessfulBackup`] when `Latest` finds no
/// candidate and [`ResolveSourceError::InvalidReference`] when an explicit
/// run is missing, foreign, not a backup, or not successful.
///
/// # Examples
///
/// ```
/// use strongroom::backup::domain::BackupPolicyId;
/// use strongroom::restore::domain::{ResolveSourceError, SourceSelection, resolve_source};
///
/// let policy_id = BackupPolicyId::new();
/// let result = resolve_source(policy_id, &[], SourceSelection::Latest);
/// assert_eq!(result, Err(ResolveSourceError::NoSuccessfulBackup(policy_id)));
/// ```
pub fn resolve_source(
    policy_id: BackupPolicyId,
    runs: &[Run],
    selection: SourceSelection,
) -> Result<&Run, ResolveSourceError> {
    match selection {
        SourceSelection::Latest => runs
            .iter()
            .filter(|run| run.is_successful_backup() && run.policy_id() == Some(policy_id))
            .max_by(|left, right| {
                left.completed_at()
                    .cmp(&right.completed_at())
                    .then_with(|| left.started_at().cmp(&right.started_at()))
                    .then_with(|| left.id().cmp(&right.id()))
            })
            .ok_or(ResolveSourceError::NoSuccessfulBackup(policy_id)),
        SourceSelection::Explicit(run_id) => {
            let invalid = |reason| ResolveSourceError::InvalidReference { run_id, reason };
            let run = runs
                .iter()
                .find(|run| run.id() == run_id)
                .ok_or_else(|| invalid(InvalidSourceReason::Missing))?;
            let Some(owner) = run.policy_id() else {
                return Err(invalid(InvalidSourceReason::NotBackup));
            };
            if owner != policy_id {
                return Err(invalid(InvalidSourceReason::ForeignPolicy));
            }
            if run.status() != RunStatus::Success {
                return Err(invalid(InvalidSourceReason::NotSuccessful(run.status())));
            }
            Ok(run)
        }
    }
}
