//! Retention pruning after successful backups.

use super::helpers::{Harness, harness};
use rstest::rstest;
use std::time::Duration;
use strongroom::config::OrchestratorConfig;
use strongroom::executor::adapters::GatewayCall;
use strongroom::run::domain::{RunStatus, RunTarget};

#[rstest]
#[case(1)]
#[case(3)]
#[tokio::test(flavor = "multi_thread")]
async fn keeps_exactly_retention_successes(harness: Harness, #[case] retention: u32) {
    let policy = harness
        .policy("vm-1", "0 0 * * *", i64::from(retention))
        .await;
    let mut completed = Vec::new();
    for _ in 0..=retention {
        completed.push(harness.backup_now(&policy).await);
    }

    let remaining = harness.runs_for(RunTarget::Policy(policy.id())).await;

    let expected: Vec<_> = completed.iter().skip(1).map(|run| run.id()).collect();
    let kept: Vec<_> = remaining.iter().map(|run| run.id()).collect();
    assert_eq!(kept, expected);
    let oldest = completed.first().expect("at least one run");
    let oldest_path = oldest.backup_path().expect("artifact path");
    assert!(!harness.gateway.artifacts().iter().any(|path| path == oldest_path));
    assert_eq!(
        harness.gateway.artifacts().len(),
        usize::try_from(retention).expect("small retention")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_runs_are_neither_counted_nor_pruned(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 1).await;
    let first = harness.backup_now(&policy).await;
    harness
        .gateway
        .fail_vm(policy.vm().id.clone(), "SR_FULL");
    let failed = harness.backup_now(&policy).await;
    harness.gateway.heal_vm(&policy.vm().id);
    let latest = harness.backup_now(&policy).await;

    let remaining = harness.runs_for(RunTarget::Policy(policy.id())).await;

    let ids: Vec<_> = remaining.iter().map(|run| run.id()).collect();
    assert_eq!(ids, vec![failed.id(), latest.id()]);
    assert!(!ids.contains(&first.id()));
    assert_eq!(
        remaining.first().map(|run| run.status()),
        Some(RunStatus::Failed)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_release_keeps_the_row_until_a_later_pass(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 1).await;
    let first = harness.backup_now(&policy).await;
    let first_path = first.backup_path().expect("artifact path").to_owned();
    harness.gateway.fail_release(first_path.clone());

    harness.backup_now(&policy).await;
    let after_failed_release = harness.runs_for(RunTarget::Policy(policy.id())).await;
    assert!(after_failed_release.iter().any(|run| run.id() == first.id()));

    harness.gateway.allow_release(&first_path);
    let last = harness.backup_now(&policy).await;
    let after_retry = harness.runs_for(RunTarget::Policy(policy.id())).await;

    let ids: Vec<_> = after_retry.iter().map(|run| run.id()).collect();
    assert_eq!(ids, vec![last.id()]);
    let released: Vec<_> = harness
        .gateway
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GatewayCall::Release { artifact_path, .. } => Some(artifact_path),
            GatewayCall::Backup(_) | GatewayCall::Restore(_) => None,
        })
        .collect();
    assert_eq!(
        released.iter().filter(|path| **path == first_path).count(),
        2
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn hung_release_times_out_and_frees_the_policy() {
    let harness = Harness::new(OrchestratorConfig::fast().with_gateway_timeout_secs(1));
    let policy = harness.policy("vm-1", "0 0 * * *", 1).await;
    let first = harness.backup_now(&policy).await;
    harness
        .gateway
        .stall_release(first.backup_path().expect("artifact path"));

    let second = tokio::time::timeout(Duration::from_secs(10), harness.backup_now(&policy))
        .await
        .expect("backup finishes despite the hung release");
    assert_eq!(second.status(), RunStatus::Success);
    let remaining = harness.runs_for(RunTarget::Policy(policy.id())).await;
    assert!(remaining.iter().any(|run| run.id() == first.id()));

    let third = tokio::time::timeout(Duration::from_secs(10), harness.backup_now(&policy))
        .await
        .expect("policy is not left locked");
    assert_eq!(third.status(), RunStatus::Success);
    let after_third: Vec<_> = harness
        .runs_for(RunTarget::Policy(policy.id()))
        .await
        .iter()
        .map(|run| run.id())
        .collect();
    assert_eq!(after_third, vec![first.id(), third.id()]);
}
