//! Cron-driven dispatch through [`Orchestrator::tick_now`].
//!
//! [`Orchestrator::tick_now`]: strongroom::orchestrator::Orchestrator::tick_now

use super::helpers::{Harness, at, harness};
use rstest::rstest;
use strongroom::backup::domain::BackupPolicyPatch;
use strongroom::executor::services::RunHandle;
use strongroom::run::domain::{Run, RunStatus, RunTarget, TriggerKind};

async fn finish(handles: Vec<RunHandle>) -> Vec<Run> {
    let mut runs = Vec::with_capacity(handles.len());
    for handle in handles {
        runs.push(handle.wait().await.expect("run should finish"));
    }
    runs
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn due_policy_runs_once_per_minute(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 3).await;

    let quiet = harness.orchestrator.tick_now(at(18, 23, 59)).await;
    let fired = finish(harness.orchestrator.tick_now(at(19, 0, 0)).await).await;
    let repeat = harness.orchestrator.tick_now(at(19, 0, 0)).await;

    assert!(quiet.is_empty());
    assert!(repeat.is_empty());
    assert_eq!(fired.len(), 1);
    let run = fired.first().expect("one run");
    assert_eq!(run.trigger(), TriggerKind::Scheduled);
    assert_eq!(run.policy_id(), Some(policy.id()));
    assert_eq!(run.status(), RunStatus::Success);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inactive_policy_is_never_triggered(harness: Harness) {
    let policy = harness.policy("vm-1", "* * * * *", 3).await;
    harness
        .orchestrator
        .update_policy(policy.id(), BackupPolicyPatch::default().with_active(false))
        .await
        .expect("deactivate");

    let mut started = Vec::new();
    for minute in 0..10 {
        started.extend(harness.orchestrator.tick_now(at(19, 1, minute)).await);
    }

    assert!(started.is_empty());
    assert!(
        harness
            .runs_for(RunTarget::Policy(policy.id()))
            .await
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reactivated_policy_is_scheduled_again(harness: Harness) {
    let policy = harness.policy("vm-1", "* * * * *", 3).await;
    harness
        .orchestrator
        .update_policy(policy.id(), BackupPolicyPatch::default().with_active(false))
        .await
        .expect("deactivate");
    assert!(harness.orchestrator.tick_now(at(19, 1, 0)).await.is_empty());

    harness
        .orchestrator
        .update_policy(policy.id(), BackupPolicyPatch::default().with_active(true))
        .await
        .expect("reactivate");

    assert_eq!(finish(harness.orchestrator.tick_now(at(19, 1, 1)).await).await.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_policy_is_unscheduled(harness: Harness) {
    let policy = harness.policy("vm-1", "* * * * *", 3).await;
    harness
        .orchestrator
        .delete_policy(policy.id())
        .await
        .expect("delete");

    assert!(harness.orchestrator.tick_now(at(19, 1, 0)).await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn three_nightly_runs_with_retention_two_prune_the_first(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 2).await;

    let mut nightly = Vec::new();
    for day in [19, 20, 21] {
        nightly.extend(finish(harness.orchestrator.tick_now(at(day, 0, 0)).await).await);
    }

    assert_eq!(nightly.len(), 3);
    assert!(nightly.iter().all(|run| run.status() == RunStatus::Success));
    let versions = harness
        .orchestrator
        .list_backup_versions(policy.id())
        .await
        .expect("versions");
    let kept: Vec<_> = versions.iter().map(|version| version.run_id).collect();
    let expected: Vec<_> = nightly.iter().rev().take(2).map(Run::id).collect();
    assert_eq!(kept, expected);
    let first_path = nightly
        .first()
        .and_then(Run::backup_path)
        .expect("first artifact");
    assert!(!harness.gateway.artifacts().iter().any(|path| path == first_path));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_failing_policy_does_not_stop_the_others(harness: Harness) {
    let broken = harness.policy("vm-broken", "0 0 * * *", 1).await;
    let healthy = harness.policy("vm-healthy", "0 0 * * *", 1).await;
    harness
        .gateway
        .fail_vm(broken.vm().id.clone(), "VM_MISSING_PV_DRIVERS");

    let runs = finish(harness.orchestrator.tick_now(at(19, 0, 0)).await).await;

    assert_eq!(runs.len(), 2);
    let status_of = |policy_id| {
        runs.iter()
            .find(|run| run.policy_id() == Some(policy_id))
            .map(Run::status)
    };
    assert_eq!(status_of(broken.id()), Some(RunStatus::Failed));
    assert_eq!(status_of(healthy.id()), Some(RunStatus::Success));
}
