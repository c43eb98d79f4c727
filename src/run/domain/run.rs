//! Run aggregate shared by backup and restore executions.

use super::{RunDomainError, RunId, RunStatus, TriggerKind};
use crate::backup::domain::BackupPolicyId;
use crate::restore::domain::RestorePlanId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind-specific payload of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunKind {
    /// Export of a policy's VM.
    Backup {
        /// Owning policy.
        policy_id: BackupPolicyId,
        /// Artifact location, set only once the run succeeds.
        backup_path: Option<String>,
    },
    /// Import of a prior backup through a restore plan.
    Restore {
        /// Owning plan.
        plan_id: RestorePlanId,
        /// Backup run whose artifact is restored.
        source_run_id: RunId,
    },
}

impl RunKind {
    /// Creates the payload for a new backup run.
    #[must_use]
    pub const fn backup(policy_id: BackupPolicyId) -> Self {
        Self::Backup {
            policy_id,
            backup_path: None,
        }
    }

    /// Creates the payload for a new restore run.
    #[must_use]
    pub const fn restore(plan_id: RestorePlanId, source_run_id: RunId) -> Self {
        Self::Restore {
            plan_id,
            source_run_id,
        }
    }

    /// Returns the storage discriminator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Backup { .. } => "backup",
            Self::Restore { .. } => "restore",
        }
    }

    /// Returns the policy or plan that owns the run.
    #[must_use]
    pub const fn target(&self) -> RunTarget {
        match self {
            Self::Backup { policy_id, .. } => RunTarget::Policy(*policy_id),
            Self::Restore { plan_id, .. } => RunTarget::Plan(*plan_id),
        }
    }
}

/// Owner of a run, used as the unit of mutual exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunTarget {
    /// A backup policy.
    Policy(BackupPolicyId),
    /// A restore plan.
    Plan(RestorePlanId),
}

impl fmt::Display for RunTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(id) => write!(f, "backup policy {id}"),
            Self::Plan(id) => write!(f, "restore plan {id}"),
        }
    }
}

/// One execution of a backup policy or restore plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    id: RunId,
    kind: RunKind,
    status: RunStatus,
    trigger: TriggerKind,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    output_message: String,
}

/// Parameter object for reconstructing a persisted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRunData {
    /// Persisted identifier.
    pub id: RunId,
    /// Persisted kind payload.
    pub kind: RunKind,
    /// Persisted status.
    pub status: RunStatus,
    /// Persisted trigger provenance.
    pub trigger: TriggerKind,
    /// Persisted start timestamp.
    pub started_at: DateTime<Utc>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted accumulated output.
    pub output_message: String,
}

impl Run {
    /// Records a new pending run.
    #[must_use]
    pub fn pending(kind: RunKind, trigger: TriggerKind, clock: &impl Clock) -> Self {
        Self {
            id: RunId::new(),
            kind,
            status: RunStatus::Pending,
            trigger,
            started_at: clock.utc(),
            completed_at: None,
            output_message: String::new(),
        }
    }

    /// Reconstructs a run from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedRunData) -> Self {
        Self {
            id: data.id,
            kind: data.kind,
            status: data.status,
            trigger: data.trigger,
            started_at: data.started_at,
            completed_at: data.completed_at,
            output_message: data.output_message,
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Returns the kind payload.
    #[must_use]
    pub const fn kind(&self) -> &RunKind {
        &self.kind
    }

    /// Returns the owning policy or plan.
    #[must_use]
    pub const fn target(&self) -> RunTarget {
        self.kind.target()
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns what caused the run.
    #[must_use]
    pub const fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    /// Returns when the run was recorded.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run reached a terminal status.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the accumulated output.
    #[must_use]
    pub fn output_message(&self) -> &str {
        &self.output_message
    }

    /// Returns the owning policy for backup runs.
    #[must_use]
    pub const fn policy_id(&self) -> Option<BackupPolicyId> {
        match &self.kind {
            RunKind::Backup { policy_id, .. } => Some(*policy_id),
            RunKind::Restore { .. } => None,
        }
    }

    /// Returns the artifact path of a successful backup run.
    #[must_use]
    pub fn backup_path(&self) -> Option<&str> {
        match &self.kind {
            RunKind::Backup { backup_path, .. } => backup_path.as_deref(),
            RunKind::Restore { .. } => None,
        }
    }

    /// Returns the restored backup run for restore runs.
    #[must_use]
    pub const fn source_run_id(&self) -> Option<RunId> {
        match &self.kind {
            RunKind::Restore { source_run_id, .. } => Some(*source_run_id),
            RunKind::Backup { .. } => None,
        }
    }

    /// Returns whether this is a backup run that finished successfully.
    #[must_use]
    pub const fn is_successful_backup(&self) -> bool {
        matches!(self.kind, RunKind::Backup { .. }) && matches!(self.status, RunStatus::Success)
    }

    /// Moves a pending run to running with its opening output line.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::InvalidTransition`] unless the run is
    /// pending.
    pub fn start(&mut self, message: &str) -> Result<(), RunDomainError> {
        self.transition(RunStatus::Running)?;
        self.output_message = message.to_owned();
        Ok(())
    }

    /// Completes a running run successfully.
    ///
    /// Backup runs record `artifact_path` as their backup path; restore runs
    /// ignore it.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::InvalidTransition`] unless the run is
    /// running, or [`RunDomainError::MissingArtifactPath`] for a backup run
    /// without an artifact path.
    pub fn succeed(
        &mut self,
        output: &str,
        artifact_path: Option<String>,
        clock: &impl Clock,
    ) -> Result<(), RunDomainError> {
        self.ensure_transition(RunStatus::Success)?;
        if let RunKind::Backup { backup_path, .. } = &mut self.kind {
            let Some(path) = artifact_path.filter(|value| !value.trim().is_empty()) else {
                return Err(RunDomainError::MissingArtifactPath(self.id));
            };
            *backup_path = Some(path);
        }
        self.status = RunStatus::Success;
        self.push_output(output);
        self.completed_at = Some(clock.utc());
        Ok(())
    }

    /// Completes a pending or running run as failed.
    ///
    /// # Errors
    ///
    /// Returns [`RunDomainError::InvalidTransition`] when the run is already
    /// terminal.
    pub fn fail(&mut self, output: &str, clock: &impl Clock) -> Result<(), RunDomainError> {
        self.transition(RunStatus::Failed)?;
        self.push_output(output);
        self.completed_at = Some(clock.utc());
        Ok(())
    }

    fn ensure_transition(&self, target: RunStatus) -> Result<(), RunDomainError> {
        if self.status.can_transition_to(target) {
            return Ok(());
        }
        Err(RunDomainError::InvalidTransition {
            run_id: self.id,
            from: self.status,
            to: target,
        })
    }

    fn transition(&mut self, target: RunStatus) -> Result<(), RunDomainError> {
        self.ensure_transition(target)?;
        self.status = target;
        Ok(())
    }

    fn push_output(&mut self, text: &str) {
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return;
        }
        if !self.output_message.is_empty() {
            self.output_message.push('\n');
        }
        self.output_message.push_str(trimmed);
    }
}
