//! Orchestrator facade wiring catalogs, scheduler, and executor together.

use super::error::{MissingEntity, OrchestratorError, OrchestratorResult, ValidationError};
use super::reports::{BackupVersion, CreatedPolicy};
use super::requests::{RunBackupNowRequest, RunRestoreNowRequest};
use crate::backup::domain::{BackupPolicy, BackupPolicyId, BackupPolicyPatch, HostAddress};
use crate::backup::ports::BackupPolicyRepository;
use crate::backup::services::{BackupPolicyService, CreateBackupPolicyRequest};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::executor::ports::HypervisorGateway;
use crate::executor::services::{JobExecutor, RunHandle, TargetGuard};
use crate::host::HostDirectory;
use crate::restore::domain::{RestorePlan, RestorePlanId, RestorePlanPatch, SourceSelection};
use crate::restore::ports::RestorePlanRepository;
use crate::restore::services::{CreateRestorePlanRequest, RestorePlanService};
use crate::run::domain::{Run, RunId, RunTarget, TriggerKind};
use crate::run::ports::RunRepository;
use crate::scheduler::{Scheduler, SchedulerHandle, Trigger, spawn_scheduler};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Storage and integration adapters the orchestrator runs on.
#[derive(Debug)]
pub struct OrchestratorParts<P, Q, R, H, G, C> {
    /// Backup policy catalog storage.
    pub policies: Arc<P>,
    /// Restore plan catalog storage.
    pub plans: Arc<Q>,
    /// Run catalog storage.
    pub runs: Arc<R>,
    /// Known hypervisor hosts.
    pub hosts: Arc<H>,
    /// Hypervisor command gateway.
    pub gateway: Arc<G>,
    /// Time source.
    pub clock: Arc<C>,
}

/// Request/response surface of the backup engine.
pub struct Orchestrator<P, Q, R, H, G, C>
where
    P: BackupPolicyRepository + 'static,
    Q: RestorePlanRepository + 'static,
    R: RunRepository + 'static,
    H: HostDirectory + 'static,
    G: HypervisorGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    policies: BackupPolicyService<P, H, C>,
    plans: RestorePlanService<Q, P, H, C>,
    runs: Arc<R>,
    executor: JobExecutor<R, G, C>,
    scheduler: Arc<Mutex<Scheduler>>,
    clock: Arc<C>,
    config: OrchestratorConfig,
}

impl<P, Q, R, H, G, C> Clone for Orchestrator<P, Q, R, H, G, C>
where
    P: BackupPolicyRepository + 'static,
    Q: RestorePlanRepository + 'static,
    R: RunRepository + 'static,
    H: HostDirectory + 'static,
    G: HypervisorGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            policies: self.policies.clone(),
            plans: self.plans.clone(),
            runs: Arc::clone(&self.runs),
            executor: self.executor.clone(),
            scheduler: Arc::clone(&self.scheduler),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

/// Background tasks started by [`Orchestrator::start`].
#[derive(Debug)]
pub struct OrchestratorHandle {
    scheduler: SchedulerHandle,
    dispatcher: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Stops scheduling and waits for pending triggers to be dispatched.
    ///
    /// Runs already executing keep going to completion.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        if let Err(err) = self.dispatcher.await {
            warn!(error = %err, "trigger dispatcher ended abnormally");
        }
    }
}

impl<P, Q, R, H, G, C> Orchestrator<P, Q, R, H, G, C>
where
    P: BackupPolicyRepository + 'static,
    Q: RestorePlanRepository + 'static,
    R: RunRepository + 'static,
    H: HostDirectory + 'static,
    G: HypervisorGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Wires the engine over `parts`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `config` does not validate.
    pub fn new(
        parts: OrchestratorParts<P, Q, R, H, G, C>,
        config: OrchestratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let OrchestratorParts {
            policies,
            plans,
            runs,
            hosts,
            gateway,
            clock,
        } = parts;

        let scheduler = Scheduler::new(config.timezone()?, config.max_catch_up_minutes);
        let executor = JobExecutor::new(Arc::clone(&runs), gateway, Arc::clone(&clock), &config);
        Ok(Self {
            policies: BackupPolicyService::new(
                Arc::clone(&policies),
                Arc::clone(&hosts),
                Arc::clone(&clock),
            ),
            plans: RestorePlanService::new(plans, policies, hosts, Arc::clone(&clock)),
            runs,
            executor,
            scheduler: Arc::new(Mutex::new(scheduler)),
            clock,
            config,
        })
    }

    /// Recovers interrupted runs, loads schedules, and starts the scheduler
    /// and trigger dispatcher.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when recovery or schedule loading fails.
    pub async fn start(&self) -> OrchestratorResult<OrchestratorHandle> {
        let interrupted = self.executor.fail_interrupted_runs().await?;
        if !interrupted.is_empty() {
            warn!(count = interrupted.len(), "failed runs interrupted by a restart");
        }
        let registered = self.load_schedules().await?;
        info!(policies = registered, "schedules loaded");

        let (sender, mut receiver) = mpsc::channel(self.config.trigger_channel_capacity);
        let scheduler = spawn_scheduler(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.clock),
            self.config.tick_interval(),
            sender,
        );
        let orchestrator = self.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(trigger) = receiver.recv().await {
                if let Err(err) = orchestrator.handle_trigger(trigger).await {
                    error!(
                        policy_id = %trigger.policy_id,
                        error = %err,
                        "could not dispatch trigger"
                    );
                }
            }
            debug!("trigger dispatcher stopped");
        });
        Ok(OrchestratorHandle {
            scheduler,
            dispatcher,
        })
    }

    /// Registers every live policy with the scheduler.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when policies cannot be listed.
    pub async fn load_schedules(&self) -> OrchestratorResult<usize> {
        let policies = self.policies.list(None).await?;
        let mut scheduler = self.scheduler();
        for policy in &policies {
            scheduler.register(policy);
        }
        Ok(scheduler.len())
    }

    /// Evaluates schedules at `now` and dispatches every due trigger.
    ///
    /// One policy's dispatch failure is logged and does not stop the rest.
    pub async fn tick_now(&self, now: DateTime<Utc>) -> Vec<RunHandle> {
        let due = self.scheduler().tick(now);
        let mut handles = Vec::with_capacity(due.len());
        for trigger in due {
            match self.handle_trigger(trigger).await {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {}
                Err(err) => error!(
                    policy_id = %trigger.policy_id,
                    error = %err,
                    "could not dispatch trigger"
                ),
            }
        }
        handles
    }

    /// Starts a scheduled backup for `trigger`.
    ///
    /// Returns `None` when the policy is gone, inactive, or still running.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the policy or run cannot be read or
    /// recorded.
    pub async fn handle_trigger(&self, trigger: Trigger) -> OrchestratorResult<Option<RunHandle>> {
        let target = RunTarget::Policy(trigger.policy_id);
        let Some(guard) = self.executor.claim(target, TriggerKind::Scheduled)? else {
            return Ok(None);
        };
        let policy = match self.policies.get(trigger.policy_id).await {
            Ok(policy) => policy,
            Err(err) => match OrchestratorError::from(err) {
                OrchestratorError::NotFound(_) => {
                    self.scheduler().unregister(trigger.policy_id);
                    debug!(policy_id = %trigger.policy_id, "dropped trigger for missing policy");
                    return Ok(None);
                }
                other => return Err(other),
            },
        };
        if !policy.is_schedulable() {
            self.scheduler().unregister(policy.id());
            debug!(policy_id = %policy.id(), "dropped trigger for inactive policy");
            return Ok(None);
        }

        debug!(
            policy_id = %policy.id(),
            fired_at = %trigger.fired_at,
            "dispatching scheduled backup"
        );
        let handle = self
            .executor
            .start_backup(&policy, TriggerKind::Scheduled, guard)
            .await?;
        Ok(Some(handle))
    }

    /// Lists live backup policies, optionally for one host.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the catalog cannot be read.
    pub async fn list_policies(
        &self,
        host: Option<&HostAddress>,
    ) -> OrchestratorResult<Vec<BackupPolicy>> {
        Ok(self.policies.list(host).await?)
    }

    /// Returns a live backup policy.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown or deleted
    /// policies.
    pub async fn get_policy(&self, id: BackupPolicyId) -> OrchestratorResult<BackupPolicy> {
        Ok(self.policies.get(id).await?)
    }

    /// Lists the restorable backups of a policy, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown or deleted
    /// policies.
    pub async fn list_backup_versions(
        &self,
        id: BackupPolicyId,
    ) -> OrchestratorResult<Vec<BackupVersion>> {
        let policy = self.policies.get(id).await?;
        let runs = self.runs.list_successful_backups(policy.id()).await?;
        Ok(runs.iter().filter_map(BackupVersion::from_run).collect())
    }

    /// Creates a backup policy and schedules it when active.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validation`] for malformed fields or an
    /// unknown host.
    pub async fn create_policy(
        &self,
        request: CreateBackupPolicyRequest,
    ) -> OrchestratorResult<CreatedPolicy> {
        let policy = self.policies.create(request).await?;
        self.scheduler().register(&policy);
        Ok(CreatedPolicy {
            storage_repository: policy.storage_repository().clone(),
            policy,
        })
    }

    /// Applies a partial update and refreshes the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown or deleted
    /// policies and [`OrchestratorError::Validation`] for invalid fields.
    pub async fn update_policy(
        &self,
        id: BackupPolicyId,
        patch: BackupPolicyPatch,
    ) -> OrchestratorResult<BackupPolicy> {
        let policy = self.policies.update(id, patch).await?;
        self.scheduler().register(&policy);
        Ok(policy)
    }

    /// Soft-deletes a policy and removes its schedule.
    ///
    /// Run history is kept.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Conflict`] while the policy has a run in
    /// flight and [`OrchestratorError::NotFound`] for unknown policies.
    pub async fn delete_policy(&self, id: BackupPolicyId) -> OrchestratorResult<BackupPolicy> {
        let target = RunTarget::Policy(id);
        let Some(guard) = self.executor.reserve(target) else {
            return Err(OrchestratorError::Conflict(target));
        };
        let deleted = self.policies.mark_deleted(id).await;
        drop(guard);
        let policy = deleted?;
        self.scheduler().unregister(id);
        Ok(policy)
    }

    /// Starts a manual backup.
    ///
    /// Await [`RunHandle::wait`] for the terminal run.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Conflict`] while the policy has a run in
    /// flight and [`OrchestratorError::Validation`] when echoed fields differ
    /// from the policy.
    pub async fn run_backup_now(&self, request: RunBackupNowRequest) -> OrchestratorResult<RunHandle> {
        let target = RunTarget::Policy(request.policy_id);
        let guard = self.claim_manual(target)?;
        let policy = self.policies.get(request.policy_id).await?;
        check_field("host", policy.host().as_str(), request.host.as_deref())?;
        check_field("vm_id", policy.vm().id.as_str(), request.vm_id.as_deref())?;
        check_field(
            "storage_repository_id",
            policy.storage_repository().id.as_str(),
            request.storage_repository_id.as_deref(),
        )?;

        Ok(self
            .executor
            .start_backup(&policy, TriggerKind::Manual, guard)
            .await?)
    }

    /// Lists every run of a policy, oldest first.
    ///
    /// History of soft-deleted policies stays readable.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown policies.
    pub async fn list_backup_runs(&self, policy_id: BackupPolicyId) -> OrchestratorResult<Vec<Run>> {
        self.policies.get_including_deleted(policy_id).await?;
        Ok(self.runs.list_for_target(RunTarget::Policy(policy_id)).await?)
    }

    /// Creates a restore plan.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validation`] for malformed fields or
    /// unknown host and policy references.
    pub async fn create_restore_plan(
        &self,
        request: CreateRestorePlanRequest,
    ) -> OrchestratorResult<RestorePlan> {
        Ok(self.plans.create(request).await?)
    }

    /// Returns a live restore plan.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown or deleted plans.
    pub async fn get_restore_plan(&self, id: RestorePlanId) -> OrchestratorResult<RestorePlan> {
        Ok(self.plans.get(id).await?)
    }

    /// Lists live restore plans.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when the catalog cannot be read.
    pub async fn list_restore_plans(&self) -> OrchestratorResult<Vec<RestorePlan>> {
        Ok(self.plans.list().await?)
    }

    /// Updates the restore flags of a plan.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown or deleted plans.
    pub async fn update_restore_plan(
        &self,
        id: RestorePlanId,
        patch: RestorePlanPatch,
    ) -> OrchestratorResult<RestorePlan> {
        Ok(self.plans.update(id, patch).await?)
    }

    /// Soft-deletes a restore plan.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Conflict`] while the plan has a run in
    /// flight and [`OrchestratorError::NotFound`] for unknown plans.
    pub async fn delete_restore_plan(&self, id: RestorePlanId) -> OrchestratorResult<RestorePlan> {
        let target = RunTarget::Plan(id);
        let Some(guard) = self.executor.reserve(target) else {
            return Err(OrchestratorError::Conflict(target));
        };
        let deleted = self.plans.mark_deleted(id).await;
        drop(guard);
        Ok(deleted?)
    }

    /// Starts a manual restore.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::Validation`] for a missing or ambiguous
    /// source selection, [`OrchestratorError::NotFound`] when the policy has
    /// no successful backup, [`OrchestratorError::InvalidReference`] when the
    /// explicit source cannot be restored, and
    /// [`OrchestratorError::Conflict`] while the plan has a run in flight.
    pub async fn run_restore_now(
        &self,
        request: RunRestoreNowRequest,
    ) -> OrchestratorResult<RunHandle> {
        let selection = SourceSelection::from_request(request.use_latest, request.source_run_id)
            .map_err(ValidationError::Selection)?;
        let guard = self.claim_manual(RunTarget::Plan(request.plan_id))?;
        let plan = self.plans.get(request.plan_id).await?;
        check_field("host", plan.host().as_str(), request.host.as_deref())?;
        check_field(
            "storage_repository_id",
            plan.storage_repository_id().as_str(),
            request.storage_repository_id.as_deref(),
        )?;

        Ok(self
            .executor
            .start_restore(&plan, selection, TriggerKind::Manual, guard)
            .await?)
    }

    /// Lists every run of a restore plan, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown plans.
    pub async fn list_restore_runs(&self, plan_id: RestorePlanId) -> OrchestratorResult<Vec<Run>> {
        self.plans.get(plan_id).await?;
        Ok(self.runs.list_for_target(RunTarget::Plan(plan_id)).await?)
    }

    /// Returns a run by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::NotFound`] for unknown runs.
    pub async fn get_run(&self, run_id: RunId) -> OrchestratorResult<Run> {
        self.runs
            .find_by_id(run_id)
            .await?
            .ok_or(OrchestratorError::NotFound(MissingEntity::Run(run_id)))
    }

    /// Takes the target lock before the policy or plan is read, so a
    /// concurrent delete either finishes first or reports a conflict.
    fn claim_manual(&self, target: RunTarget) -> OrchestratorResult<TargetGuard> {
        self.executor
            .claim(target, TriggerKind::Manual)?
            .ok_or(OrchestratorError::Conflict(target))
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_field(
    field: &'static str,
    stored: &str,
    requested: Option<&str>,
) -> Result<(), ValidationError> {
    match requested {
        Some(value) if value != stored => Err(ValidationError::Mismatch {
            field,
            stored: stored.to_owned(),
            requested: value.to_owned(),
        }),
        _ => Ok(()),
    }
}
