//! Retention enforcement against the run catalog and the hypervisor.

use super::{ArtifactPins, select_for_pruning};
use crate::backup::domain::{BackupPolicy, HostAddress};
use crate::executor::ports::{GatewayError, GatewayResult, HypervisorGateway};
use crate::executor::services::HostLimiter;
use crate::run::{
    domain::{RunId, RunTarget},
    ports::{RunRepository, RunRepositoryError},
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Summary of one retention pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Successful backups left in place.
    pub kept: usize,
    /// Runs whose artifact was released and row deleted.
    pub pruned: Vec<RunId>,
    /// Runs due for pruning but left for a later pass.
    pub deferred: Vec<RunId>,
}

/// Errors returned by a retention pass.
#[derive(Debug, Error)]
pub enum RetentionError {
    /// Run catalog access failed.
    #[error(transparent)]
    Repository(#[from] RunRepositoryError),
}

/// Applies a policy's retention count to its successful backups.
pub struct RetentionEnforcer<R, G>
where
    R: RunRepository,
    G: HypervisorGateway,
{
    runs: Arc<R>,
    gateway: Arc<G>,
    pins: ArtifactPins,
    hosts: HostLimiter,
    release_timeout: Duration,
}

impl<R, G> Clone for RetentionEnforcer<R, G>
where
    R: RunRepository,
    G: HypervisorGateway,
{
    fn clone(&self) -> Self {
        Self {
            runs: Arc::clone(&self.runs),
            gateway: Arc::clone(&self.gateway),
            pins: self.pins.clone(),
            hosts: self.hosts.clone(),
            release_timeout: self.release_timeout,
        }
    }
}

impl<R, G> RetentionEnforcer<R, G>
where
    R: RunRepository,
    G: HypervisorGateway,
{
    /// Creates an enforcer sharing the given pin registry and host bound.
    ///
    /// Each artifact release waits for a permit from `hosts` and is abandoned
    /// after `release_timeout`.
    #[must_use]
    pub const fn new(
        runs: Arc<R>,
        gateway: Arc<G>,
        pins: ArtifactPins,
        hosts: HostLimiter,
        release_timeout: Duration,
    ) -> Self {
        Self {
            runs,
            gateway,
            pins,
            hosts,
            release_timeout,
        }
    }

    /// Prunes successful backups of `policy` beyond its retention count.
    ///
    /// Callers hold the policy's target lock so no backup of the policy
    /// completes concurrently. Pinned runs and runs whose artifact release
    /// fails or times out keep their rows and are reported as deferred.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::Repository`] when the run catalog cannot be
    /// read or a row cannot be deleted.
    pub async fn enforce(&self, policy: &BackupPolicy) -> Result<RetentionReport, RetentionError> {
        let pins = self.pins.lock().await;
        let history = self
            .runs
            .list_for_target(RunTarget::Policy(policy.id()))
            .await?;
        let doomed = select_for_pruning(&history, policy.retention());
        let successes = history.iter().filter(|run| run.is_successful_backup()).count();
        let mut report = RetentionReport {
            kept: successes.saturating_sub(doomed.len()),
            ..RetentionReport::default()
        };

        for run in doomed {
            if pins.is_pinned(run.id()) {
                info!(
                    policy_id = %policy.id(),
                    run_id = %run.id(),
                    "retention deferred: backup is the source of a running restore"
                );
                report.deferred.push(run.id());
                continue;
            }
            if let Some(path) = run.backup_path() {
                if let Err(err) = self.release(policy.host(), path).await {
                    warn!(
                        policy_id = %policy.id(),
                        run_id = %run.id(),
                        artifact = path,
                        error = %err,
                        "artifact release failed, keeping run for the next pass"
                    );
                    report.deferred.push(run.id());
                    continue;
                }
            }
            match self.runs.delete_backup(run.id()).await {
                Ok(()) | Err(RunRepositoryError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
            info!(
                policy_id = %policy.id(),
                run_id = %run.id(),
                retention = %policy.retention(),
                "pruned backup beyond retention"
            );
            report.pruned.push(run.id());
        }
        drop(pins);
        Ok(report)
    }

    async fn release(&self, host: &HostAddress, artifact_path: &str) -> GatewayResult<()> {
        let permit = self.hosts.acquire(host).await;
        let released = tokio::time::timeout(
            self.release_timeout,
            self.gateway.release_artifact(host, artifact_path),
        )
        .await;
        drop(permit);
        released.unwrap_or_else(|_| {
            Err(GatewayError::TimedOut {
                seconds: self.release_timeout.as_secs(),
            })
        })
    }
}
