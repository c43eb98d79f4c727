//! Submission and execution of backup and restore runs.

use super::{HostLimiter, RunHandle, TargetGuard, TargetLocks};
use crate::backup::domain::BackupPolicy;
use crate::config::OrchestratorConfig;
use crate::executor::ports::{
    BackupJob, GatewayError, GatewayOutcome, HypervisorGateway, RestoreJob,
};
use crate::restore::domain::{
    InvalidSourceReason, ResolveSourceError, RestorePlan, SourceSelection, resolve_source,
};
use crate::retention::{ArtifactPins, RetentionEnforcer};
use crate::run::{
    domain::{Run, RunDomainError, RunId, RunKind, RunStatus, RunTarget, TriggerKind},
    ports::{RunRepository, RunRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::error::Elapsed;
use tracing::{error, info, warn};

const BACKUP_STARTED: &str = "Backup job started...";
const RESTORE_STARTED: &str = "Restore job started...";
const INTERRUPTED: &str = "Run interrupted: the orchestrator stopped before it finished";

/// Errors returned when a run cannot be accepted.
///
/// Failures during execution never surface here; they end the run as
/// `failed` instead.
#[derive(Debug, Error)]
pub enum JobExecutorError {
    /// The target already has a run in flight.
    #[error("{0} already has a run in progress")]
    Conflict(RunTarget),
    /// The restore source could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveSourceError),
    /// A run lifecycle transition was rejected.
    #[error(transparent)]
    Domain(#[from] RunDomainError),
    /// Run catalog access failed.
    #[error(transparent)]
    Repository(#[from] RunRepositoryError),
    /// The execution task ended without producing a run.
    #[error("run {run_id} was aborted: {reason}")]
    Aborted {
        /// Affected run.
        run_id: RunId,
        /// Join failure description.
        reason: String,
    },
}

/// Result type for job executor operations.
pub type JobExecutorResult<T> = Result<T, JobExecutorError>;

/// Result of submitting a run.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The run was recorded and is executing.
    Started(RunHandle),
    /// A scheduled trigger found the target busy; nothing was recorded.
    Skipped {
        /// Busy policy or plan.
        target: RunTarget,
    },
}

impl SubmitOutcome {
    /// Returns the handle of a started run.
    #[must_use]
    pub fn into_handle(self) -> Option<RunHandle> {
        match self {
            Self::Started(handle) => Some(handle),
            Self::Skipped { .. } => None,
        }
    }
}

/// Drives runs through `pending -> running -> success | failed`.
pub struct JobExecutor<R, G, C>
where
    R: RunRepository + 'static,
    G: HypervisorGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    runs: Arc<R>,
    gateway: Arc<G>,
    clock: Arc<C>,
    locks: TargetLocks,
    hosts: HostLimiter,
    pins: ArtifactPins,
    retention: RetentionEnforcer<R, G>,
    gateway_timeout: Duration,
}

impl<R, G, C> Clone for JobExecutor<R, G, C>
where
    R: RunRepository + 'static,
    G: HypervisorGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            runs: Arc::clone(&self.runs),
            gateway: Arc::clone(&self.gateway),
            clock: Arc::clone(&self.clock),
            locks: self.locks.clone(),
            hosts: self.hosts.clone(),
            pins: self.pins.clone(),
            retention: self.retention.clone(),
            gateway_timeout: self.gateway_timeout,
        }
    }
}

impl<R, G, C> JobExecutor<R, G, C>
where
    R: RunRepository + 'static,
    G: HypervisorGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an executor using the timeout and host bound from `config`.
    #[must_use]
    pub fn new(runs: Arc<R>, gateway: Arc<G>, clock: Arc<C>, config: &OrchestratorConfig) -> Self {
        let pins = ArtifactPins::new();
        let hosts = HostLimiter::new(config.max_concurrent_per_host);
        let gateway_timeout = config.gateway_timeout();
        let retention = RetentionEnforcer::new(
            Arc::clone(&runs),
            Arc::clone(&gateway),
            pins.clone(),
            hosts.clone(),
            gateway_timeout,
        );
        Self {
            runs,
            gateway,
            clock,
            locks: TargetLocks::new(),
            hosts,
            pins,
            retention,
            gateway_timeout,
        }
    }

    /// Returns whether `target` has a run in flight.
    #[must_use]
    pub fn is_busy(&self, target: RunTarget) -> bool {
        self.locks.is_locked(target)
    }

    /// Takes the lock of an idle target without starting a run.
    ///
    /// Used to keep runs from starting while a policy or plan is deleted.
    #[must_use]
    pub fn reserve(&self, target: RunTarget) -> Option<TargetGuard> {
        self.locks.try_acquire(target)
    }

    /// Takes the lock of `target` for a run started by `trigger`.
    ///
    /// A busy target yields `Ok(None)` for scheduled triggers and
    /// [`JobExecutorError::Conflict`] for manual ones. Callers load the
    /// policy or plan while holding the returned guard and hand both to
    /// [`Self::start_backup`] or [`Self::start_restore`].
    ///
    /// # Errors
    ///
    /// Returns [`JobExecutorError::Conflict`] for a manual trigger while the
    /// target has a run in flight.
    pub fn claim(
        &self,
        target: RunTarget,
        trigger: TriggerKind,
    ) -> JobExecutorResult<Option<TargetGuard>> {
        if let Some(guard) = self.locks.try_acquire(target) {
            return Ok(Some(guard));
        }
        busy(target, trigger).map(|_| None)
    }

    /// Records a backup run for `policy` and starts executing it.
    ///
    /// # Errors
    ///
    /// Returns [`JobExecutorError::Conflict`] for a manual trigger while the
    /// policy has a run in flight, or a repository error when the run cannot
    /// be recorded.
    pub async fn submit_backup(
        &self,
        policy: &BackupPolicy,
        trigger: TriggerKind,
    ) -> JobExecutorResult<SubmitOutcome> {
        let target = RunTarget::Policy(policy.id());
        let Some(guard) = self.locks.try_acquire(target) else {
            return busy(target, trigger);
        };
        self.start_backup(policy, trigger, guard)
            .await
            .map(SubmitOutcome::Started)
    }

    /// Records a backup run for `policy` under an already claimed `guard`.
    ///
    /// The guard is held until the run and its retention pass finish.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the run cannot be recorded.
    pub async fn start_backup(
        &self,
        policy: &BackupPolicy,
        trigger: TriggerKind,
        guard: TargetGuard,
    ) -> JobExecutorResult<RunHandle> {
        let target = guard.target();
        let run = self
            .record_running(RunKind::backup(policy.id()), trigger, BACKUP_STARTED)
            .await?;
        let job = BackupJob {
            run_id: run.id(),
            host: policy.host().clone(),
            vm_id: policy.vm().id.clone(),
            storage_repository_id: policy.storage_repository().id.clone(),
        };
        info!(
            run_id = %run.id(),
            policy_id = %policy.id(),
            trigger = %trigger,
            "backup run started"
        );

        let run_id = run.id();
        let execution = tokio::spawn(self.clone().execute_backup(run.clone(), policy.clone(), job));
        let supervisor = tokio::spawn(self.clone().supervise(run, execution, guard, None));
        Ok(RunHandle::new(run_id, target, supervisor))
    }

    /// Resolves a restore source for `plan`, records the run, and starts it.
    ///
    /// # Errors
    ///
    /// Returns [`JobExecutorError::Conflict`] for a manual trigger while the
    /// plan has a run in flight, [`JobExecutorError::Resolve`] when no usable
    /// source backup exists, or a repository error.
    pub async fn submit_restore(
        &self,
        plan: &RestorePlan,
        selection: SourceSelection,
        trigger: TriggerKind,
    ) -> JobExecutorResult<SubmitOutcome> {
        let target = RunTarget::Plan(plan.id());
        let Some(guard) = self.locks.try_acquire(target) else {
            return busy(target, trigger);
        };
        self.start_restore(plan, selection, trigger, guard)
            .await
            .map(SubmitOutcome::Started)
    }

    /// Resolves and pins a restore source, then records and starts the run
    /// under an already claimed `guard`.
    ///
    /// # Errors
    ///
    /// Returns [`JobExecutorError::Resolve`] when no usable source backup
    /// exists, or a repository error.
    pub async fn start_restore(
        &self,
        plan: &RestorePlan,
        selection: SourceSelection,
        trigger: TriggerKind,
        guard: TargetGuard,
    ) -> JobExecutorResult<RunHandle> {
        let target = guard.target();
        let (source_id, artifact_path) = self.pin_source(plan, selection).await?;
        let recorded = self
            .record_running(
                RunKind::restore(plan.id(), source_id),
                trigger,
                RESTORE_STARTED,
            )
            .await;
        let run = match recorded {
            Ok(run) => run,
            Err(err) => {
                self.pins.unpin(source_id).await;
                return Err(err);
            }
        };
        let options = plan.options();
        let job = RestoreJob {
            run_id: run.id(),
            host: plan.host().clone(),
            storage_repository_id: plan.storage_repository_id().clone(),
            artifact_path,
            preserve: options.preserve,
            power_on_after_restore: options.power_on_after_restore,
        };
        info!(
            run_id = %run.id(),
            plan_id = %plan.id(),
            source_run_id = %source_id,
            trigger = %trigger,
            "restore run started"
        );

        let run_id = run.id();
        let execution = tokio::spawn(self.clone().execute_restore(run.clone(), job));
        let supervisor =
            tokio::spawn(self.clone().supervise(run, execution, guard, Some(source_id)));
        Ok(RunHandle::new(run_id, target, supervisor))
    }

    /// Fails every run left pending or running by a previous process.
    ///
    /// Call once at start-up, before any submission.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the catalog cannot be read or updated.
    pub async fn fail_interrupted_runs(&self) -> JobExecutorResult<Vec<RunId>> {
        let mut interrupted = self.runs.list_by_status(RunStatus::Pending).await?;
        interrupted.extend(self.runs.list_by_status(RunStatus::Running).await?);

        let mut failed = Vec::with_capacity(interrupted.len());
        for mut run in interrupted {
            run.fail(INTERRUPTED, &*self.clock)?;
            self.runs.update(&run).await?;
            warn!(run_id = %run.id(), target = %run.target(), "failed interrupted run");
            failed.push(run.id());
        }
        Ok(failed)
    }

    async fn record_running(
        &self,
        kind: RunKind,
        trigger: TriggerKind,
        opening_line: &str,
    ) -> JobExecutorResult<Run> {
        let mut run = Run::pending(kind, trigger, &*self.clock);
        self.runs.store(&run).await?;
        run.start(opening_line)?;
        if let Err(err) = self.runs.update(&run).await {
            self.abandon(&mut run, &err.to_string()).await;
            return Err(err.into());
        }
        Ok(run)
    }

    async fn abandon(&self, run: &mut Run, reason: &str) {
        if let Err(err) = run.fail(reason, &*self.clock) {
            warn!(run_id = %run.id(), error = %err, "could not abandon run");
            return;
        }
        if let Err(err) = self.runs.update(run).await {
            warn!(run_id = %run.id(), error = %err, "could not record abandoned run");
        }
    }

    async fn pin_source(
        &self,
        plan: &RestorePlan,
        selection: SourceSelection,
    ) -> JobExecutorResult<(RunId, String)> {
        let mut pins = self.pins.lock().await;
        let mut history = self
            .runs
            .list_for_target(RunTarget::Policy(plan.policy_id()))
            .await?;
        if let SourceSelection::Explicit(run_id) = selection {
            if !history.iter().any(|run| run.id() == run_id) {
                history.extend(self.runs.find_by_id(run_id).await?);
            }
        }

        let source = resolve_source(plan.policy_id(), &history, selection)?;
        let artifact_path = source
            .backup_path()
            .map(str::to_owned)
            .ok_or(ResolveSourceError::InvalidReference {
                run_id: source.id(),
                reason: InvalidSourceReason::MissingArtifact,
            })?;
        pins.pin(source.id());
        Ok((source.id(), artifact_path))
    }

    async fn execute_backup(self, mut run: Run, policy: BackupPolicy, job: BackupJob) -> Run {
        let permit = self.hosts.acquire(&job.host).await;
        let result = tokio::time::timeout(self.gateway_timeout, self.gateway.backup(&job)).await;
        drop(permit);

        let outcome = settle(result, self.gateway_timeout);
        self.finish(&mut run, outcome).await;

        if run.is_successful_backup() {
            match self.retention.enforce(&policy).await {
                Ok(report) if !report.deferred.is_empty() => warn!(
                    policy_id = %policy.id(),
                    deferred = report.deferred.len(),
                    "retention left runs for a later pass"
                ),
                Ok(_) => {}
                Err(err) => error!(
                    policy_id = %policy.id(),
                    error = %err,
                    "retention pass failed"
                ),
            }
        }
        run
    }

    async fn execute_restore(self, mut run: Run, job: RestoreJob) -> Run {
        let permit = self.hosts.acquire(&job.host).await;
        let result = tokio::time::timeout(self.gateway_timeout, self.gateway.restore(&job)).await;
        drop(permit);

        let outcome = settle(result, self.gateway_timeout);
        self.finish(&mut run, outcome).await;
        run
    }

    /// Awaits an execution task, failing its run if the task died, then
    /// releases the pinned source and the target lock.
    async fn supervise(
        self,
        run: Run,
        execution: JoinHandle<Run>,
        guard: TargetGuard,
        pinned_source: Option<RunId>,
    ) -> Run {
        let finished = match execution.await {
            Ok(finished) => finished,
            Err(err) => self.fail_aborted(run, &err).await,
        };
        if let Some(source_id) = pinned_source {
            self.pins.unpin(source_id).await;
        }
        drop(guard);
        finished
    }

    async fn fail_aborted(&self, snapshot: Run, err: &JoinError) -> Run {
        let reason = if err.is_panic() {
            "Run aborted: the execution task panicked"
        } else {
            "Run aborted: the execution task was cancelled"
        };
        error!(run_id = %snapshot.id(), error = %err, "run execution aborted");

        let mut run = match self.runs.find_by_id(snapshot.id()).await {
            Ok(Some(stored)) if stored.status().is_terminal() => return stored,
            Ok(Some(stored)) => stored,
            Ok(None) => snapshot,
            Err(lookup) => {
                warn!(run_id = %snapshot.id(), error = %lookup, "could not reload aborted run");
                snapshot
            }
        };
        self.abandon(&mut run, reason).await;
        run
    }

    async fn finish(&self, run: &mut Run, outcome: GatewayOutcome) {
        let GatewayOutcome {
            succeeded,
            output,
            artifact_path,
        } = outcome;
        let completed = if succeeded {
            run.succeed(&output, artifact_path, &*self.clock)
        } else {
            run.fail(&output, &*self.clock)
        };
        if let Err(err) = completed {
            warn!(run_id = %run.id(), error = %err, "gateway outcome rejected");
            let reason = format!("{output}\n{err}");
            if let Err(fail_err) = run.fail(&reason, &*self.clock) {
                error!(run_id = %run.id(), error = %fail_err, "run left in flight");
                return;
            }
        }

        if let Err(err) = self.runs.update(run).await {
            error!(run_id = %run.id(), error = %err, "could not record run outcome");
            return;
        }
        match run.status() {
            RunStatus::Success => info!(
                run_id = %run.id(),
                target = %run.target(),
                "run succeeded"
            ),
            status => warn!(
                run_id = %run.id(),
                target = %run.target(),
                status = %status,
                output = run.output_message(),
                "run did not succeed"
            ),
        }
    }
}

fn busy(target: RunTarget, trigger: TriggerKind) -> JobExecutorResult<SubmitOutcome> {
    match trigger {
        TriggerKind::Scheduled => {
            warn!(target = %target, "skipping trigger: previous run still in progress");
            Ok(SubmitOutcome::Skipped { target })
        }
        TriggerKind::Manual => Err(JobExecutorError::Conflict(target)),
    }
}

fn settle(
    result: Result<Result<GatewayOutcome, GatewayError>, Elapsed>,
    timeout: Duration,
) -> GatewayOutcome {
    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => GatewayOutcome::failure(err.to_string()),
        Err(_) => GatewayOutcome::failure(
            GatewayError::TimedOut {
                seconds: timeout.as_secs(),
            }
            .to_string(),
        ),
    }
}
