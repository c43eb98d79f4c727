//! Hypervisor gateway port.
//!
//! The gateway hides the hypervisor management protocol. Each call performs
//! one complete job and reports a success flag, free-form output, and for
//! backups the location of the exported artifact.

use crate::backup::domain::{HostAddress, StorageRepositoryId, VmId};
use crate::run::domain::RunId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Payload of a backup export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJob {
    /// Run being executed; names the artifact file.
    pub run_id: RunId,
    /// Host running the VM.
    pub host: HostAddress,
    /// VM to export.
    pub vm_id: VmId,
    /// Storage repository receiving the artifact.
    pub storage_repository_id: StorageRepositoryId,
}

/// Payload of a restore import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreJob {
    /// Run being executed.
    pub run_id: RunId,
    /// Destination host.
    pub host: HostAddress,
    /// Destination storage repository.
    pub storage_repository_id: StorageRepositoryId,
    /// Artifact of the resolved source backup run.
    pub artifact_path: String,
    /// Keep the original VM identity on import.
    pub preserve: bool,
    /// Start the VM after import.
    pub power_on_after_restore: bool,
}

/// Outcome reported by the hypervisor for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOutcome {
    /// Whether the job succeeded.
    pub succeeded: bool,
    /// Output captured verbatim.
    pub output: String,
    /// Artifact written by a backup export.
    pub artifact_path: Option<String>,
}

impl GatewayOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
            artifact_path: None,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
            artifact_path: None,
        }
    }

    /// Attaches an artifact path.
    #[must_use]
    pub fn with_artifact_path(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }
}

/// Hypervisor job contract.
#[async_trait]
pub trait HypervisorGateway: Send + Sync {
    /// Exports a VM snapshot to the storage repository.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the host cannot be reached. Job-level
    /// failures are reported through [`GatewayOutcome::succeeded`].
    async fn backup(&self, job: &BackupJob) -> GatewayResult<GatewayOutcome>;

    /// Imports a backup artifact into the storage repository.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the host cannot be reached.
    async fn restore(&self, job: &RestoreJob) -> GatewayResult<GatewayOutcome>;

    /// Removes a backup artifact from the host's storage.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the artifact could not be removed.
    async fn release_artifact(&self, host: &HostAddress, artifact_path: &str)
    -> GatewayResult<()>;
}

/// Errors raised by gateway implementations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The host could not be reached.
    #[error("host {host} unreachable: {reason}")]
    Unreachable {
        /// Target host.
        host: HostAddress,
        /// Transport diagnostic.
        reason: String,
    },

    /// The hypervisor rejected a command.
    #[error("command failed on {host}: {output}")]
    CommandFailed {
        /// Target host.
        host: HostAddress,
        /// Captured output.
        output: String,
    },

    /// The call did not finish within the configured bound.
    #[error("gateway call timed out after {seconds} seconds")]
    TimedOut {
        /// Bound that elapsed.
        seconds: u64,
    },

    /// Transport-layer failure.
    #[error("gateway transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

/// Location of the artifact a backup job writes.
///
/// Artifacts live under the storage repository mount as
/// `/run/sr-mount/<sr>/xcp-backups/<vm>/<run-id>.xva`.
#[must_use]
pub fn artifact_path_for(job: &BackupJob) -> String {
    format!(
        "{}/{}.xva",
        artifact_directory_for(&job.storage_repository_id, &job.vm_id),
        job.run_id
    )
}

/// Directory holding every artifact of one VM on one storage repository.
#[must_use]
pub fn artifact_directory_for(storage_repository_id: &StorageRepositoryId, vm_id: &VmId) -> String {
    format!("/run/sr-mount/{storage_repository_id}/xcp-backups/{vm_id}")
}
