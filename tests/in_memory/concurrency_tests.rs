//! Per-target exclusion, host bounds, and restart recovery.

use super::helpers::{HOST, Harness, OTHER_HOST, at, host};
use async_trait::async_trait;
use mockable::DefaultClock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strongroom::backup::adapters::memory::InMemoryBackupPolicyRepository;
use strongroom::backup::domain::{BackupPolicy, BackupPolicyId, HostAddress};
use strongroom::backup::ports::{BackupPolicyRepository, BackupPolicyRepositoryResult};
use strongroom::backup::services::CreateBackupPolicyRequest;
use strongroom::config::OrchestratorConfig;
use strongroom::executor::adapters::InMemoryHypervisorGateway;
use strongroom::host::InMemoryHostDirectory;
use strongroom::orchestrator::{
    Orchestrator, OrchestratorError, OrchestratorParts, RunBackupNowRequest,
};
use strongroom::restore::adapters::memory::InMemoryRestorePlanRepository;
use strongroom::run::adapters::memory::InMemoryRunRepository;
use strongroom::run::domain::{Run, RunKind, RunStatus, RunTarget, TriggerKind};
use strongroom::run::ports::RunRepository;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Policy store that can hold the next lookup until the test lets it go.
struct PausingPolicies {
    inner: InMemoryBackupPolicyRepository,
    armed: AtomicBool,
    reached: Semaphore,
    resume: Semaphore,
}

impl PausingPolicies {
    fn new() -> Self {
        Self {
            inner: InMemoryBackupPolicyRepository::new(),
            armed: AtomicBool::new(false),
            reached: Semaphore::new(0),
            resume: Semaphore::new(0),
        }
    }

    fn pause_next_lookup(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn wait_until_paused(&self) {
        self.reached
            .acquire()
            .await
            .expect("semaphore open")
            .forget();
    }

    fn resume(&self) {
        self.resume.add_permits(1);
    }
}

#[async_trait]
impl BackupPolicyRepository for PausingPolicies {
    async fn store(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()> {
        self.inner.store(policy).await
    }

    async fn update(&self, policy: &BackupPolicy) -> BackupPolicyRepositoryResult<()> {
        self.inner.update(policy).await
    }

    async fn find_by_id(
        &self,
        id: BackupPolicyId,
    ) -> BackupPolicyRepositoryResult<Option<BackupPolicy>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.add_permits(1);
            if let Ok(permit) = self.resume.acquire().await {
                permit.forget();
            }
        }
        self.inner.find_by_id(id).await
    }

    async fn list(
        &self,
        host: Option<&HostAddress>,
    ) -> BackupPolicyRepositoryResult<Vec<BackupPolicy>> {
        self.inner.list(host).await
    }
}

fn gated() -> Harness {
    Harness::with_gateway(OrchestratorConfig::fast(), InMemoryHypervisorGateway::gated())
}

async fn wait_for_calls(gateway: &InMemoryHypervisorGateway, expected: usize) {
    for _ in 0..500 {
        if gateway.calls().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("gateway saw {} calls, expected {expected}", gateway.calls().len());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_manual_submissions_start_one_run() {
    let harness = gated();
    let policy = harness.policy("vm-1", "0 0 * * *", 3).await;

    let mut submissions = JoinSet::new();
    for _ in 0..8 {
        let orchestrator = harness.orchestrator.clone();
        let policy_id = policy.id();
        submissions.spawn(async move {
            orchestrator
                .run_backup_now(RunBackupNowRequest::new(policy_id))
                .await
        });
    }
    let mut handles = Vec::new();
    let mut conflicts = 0;
    while let Some(joined) = submissions.join_next().await {
        match joined.expect("submission task") {
            Ok(handle) => handles.push(handle),
            Err(OrchestratorError::Conflict(target)) => {
                assert_eq!(target, RunTarget::Policy(policy.id()));
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(handles.len(), 1);
    assert_eq!(conflicts, 7);
    assert_eq!(harness.runs_for(RunTarget::Policy(policy.id())).await.len(), 1);
    harness.gateway.open_gate(1);
    for handle in handles {
        handle.wait().await.expect("run should finish");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_run_now_conflicts_with_a_running_backup() {
    let harness = gated();
    let policy = harness.policy("vm-1", "0 0 * * *", 3).await;
    let scheduled = harness.orchestrator.tick_now(at(19, 0, 0)).await;
    assert_eq!(scheduled.len(), 1);

    let manual = harness
        .orchestrator
        .run_backup_now(RunBackupNowRequest::new(policy.id()))
        .await;
    let delete = harness.orchestrator.delete_policy(policy.id()).await;

    assert!(matches!(manual, Err(OrchestratorError::Conflict(_))));
    assert!(matches!(delete, Err(OrchestratorError::Conflict(_))));
    let history = harness.runs_for(RunTarget::Policy(policy.id())).await;
    assert_eq!(history.len(), 1);
    assert_eq!(
        history.first().map(Run::status),
        Some(RunStatus::Running)
    );

    harness.gateway.open_gate(1);
    for handle in scheduled {
        handle.wait().await.expect("run should finish");
    }
    harness
        .orchestrator
        .delete_policy(policy.id())
        .await
        .expect("delete succeeds once idle");
}

#[tokio::test(flavor = "multi_thread")]
async fn scheduled_trigger_is_skipped_while_running() {
    let harness = gated();
    let policy = harness.policy("vm-1", "* * * * *", 3).await;
    let manual = harness
        .orchestrator
        .run_backup_now(RunBackupNowRequest::new(policy.id()))
        .await
        .expect("manual run accepted");

    let skipped = harness.orchestrator.tick_now(at(19, 0, 0)).await;

    assert!(skipped.is_empty());
    assert_eq!(harness.runs_for(RunTarget::Policy(policy.id())).await.len(), 1);
    harness.gateway.open_gate(1);
    let run = manual.wait().await.expect("run should finish");
    assert_eq!(run.trigger(), TriggerKind::Manual);
}

#[tokio::test(flavor = "multi_thread")]
async fn gateway_calls_are_bounded_per_host() {
    let config = OrchestratorConfig {
        max_concurrent_per_host: 1,
        ..OrchestratorConfig::fast()
    };
    let harness = Harness::with_gateway(config, InMemoryHypervisorGateway::gated());
    let first = harness.policy("vm-1", "0 0 * * *", 3).await;
    let second = harness.policy("vm-2", "0 0 * * *", 3).await;

    let handles = harness.orchestrator.tick_now(at(19, 0, 0)).await;
    assert_eq!(handles.len(), 2);
    wait_for_calls(&harness.gateway, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.gateway.calls().len(), 1);

    harness.gateway.open_gate(2);
    for handle in handles {
        assert_eq!(
            handle.wait().await.expect("run should finish").status(),
            RunStatus::Success
        );
    }
    assert_eq!(harness.gateway.peak_concurrency(&host(HOST)), 1);
    assert_eq!(harness.gateway.backup_count(&first.vm().id), 1);
    assert_eq!(harness.gateway.backup_count(&second.vm().id), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn distinct_hosts_run_in_parallel() {
    let config = OrchestratorConfig {
        max_concurrent_per_host: 1,
        ..OrchestratorConfig::fast()
    };
    let harness = Harness::with_gateway(config, InMemoryHypervisorGateway::gated());
    harness.policy("vm-1", "0 0 * * *", 3).await;
    harness
        .orchestrator
        .create_policy(CreateBackupPolicyRequest::new(
            "remote", OTHER_HOST, "vm-2", "sr-2", "0 0 * * *", 3,
        ))
        .await
        .expect("policy creation should succeed");

    let handles = harness.orchestrator.tick_now(at(19, 0, 0)).await;
    wait_for_calls(&harness.gateway, 2).await;

    harness.gateway.open_gate(2);
    for handle in handles {
        handle.wait().await.expect("run should finish");
    }
    assert_eq!(harness.gateway.peak_concurrency(&host(HOST)), 1);
    assert_eq!(harness.gateway.peak_concurrency(&host(OTHER_HOST)), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn start_fails_runs_interrupted_by_a_restart() {
    let harness = Harness::new(OrchestratorConfig::fast());
    let policy = harness.policy("vm-1", "0 0 1 1 *", 3).await;
    let mut stale = Run::pending(
        RunKind::backup(policy.id()),
        TriggerKind::Scheduled,
        &DefaultClock,
    );
    stale.start("Backup job started...").expect("start");
    harness.runs.store(&stale).await.expect("store");

    let handle = harness.orchestrator.start().await.expect("start");
    handle.shutdown().await;

    let recovered = harness
        .orchestrator
        .get_run(stale.id())
        .await
        .expect("run exists");
    assert_eq!(recovered.status(), RunStatus::Failed);
    assert!(recovered.output_message().contains("interrupted"));
    let run = harness.backup_now(&policy).await;
    assert_eq!(run.status(), RunStatus::Success);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_during_manual_submission_is_a_conflict() {
    let policies = Arc::new(PausingPolicies::new());
    let runs = Arc::new(InMemoryRunRepository::new());
    let orchestrator = Orchestrator::new(
        OrchestratorParts {
            policies: Arc::clone(&policies),
            plans: Arc::new(InMemoryRestorePlanRepository::new()),
            runs: Arc::clone(&runs),
            hosts: Arc::new(InMemoryHostDirectory::with_hosts([host(HOST)])),
            gateway: Arc::new(InMemoryHypervisorGateway::new()),
            clock: Arc::new(DefaultClock),
        },
        OrchestratorConfig::fast(),
    )
    .expect("valid configuration");
    let policy = orchestrator
        .create_policy(CreateBackupPolicyRequest::new(
            "backup-vm-1",
            HOST,
            "vm-1",
            "sr-1",
            "0 0 * * *",
            1,
        ))
        .await
        .expect("policy creation")
        .policy;

    policies.pause_next_lookup();
    let submitting = orchestrator.clone();
    let policy_id = policy.id();
    let submission = tokio::spawn(async move {
        submitting
            .run_backup_now(RunBackupNowRequest::new(policy_id))
            .await
    });
    policies.wait_until_paused().await;

    let deleted = orchestrator.delete_policy(policy.id()).await;
    assert!(matches!(deleted, Err(OrchestratorError::Conflict(_))));

    policies.resume();
    let finished = submission
        .await
        .expect("submission task")
        .expect("backup accepted")
        .wait()
        .await
        .expect("backup finishes");
    assert_eq!(finished.status(), RunStatus::Success);
    assert!(orchestrator.get_policy(policy.id()).await.is_ok());
    orchestrator
        .delete_policy(policy.id())
        .await
        .expect("idle policy can be deleted");
}
