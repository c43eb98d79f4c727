//! Restore plans and restore source resolution.

use super::helpers::{HOST, Harness, harness};
use rstest::rstest;
use strongroom::backup::domain::BackupPolicyId;
use strongroom::executor::adapters::GatewayCall;
use strongroom::orchestrator::{
    ErrorKind, MissingEntity, OrchestratorError, RunRestoreNowRequest, ValidationError,
};
use strongroom::restore::domain::{InvalidSourceReason, RestorePlan, RestorePlanPatch};
use strongroom::restore::services::CreateRestorePlanRequest;
use strongroom::run::domain::{Run, RunId, RunStatus, RunTarget};

async fn plan_for(harness: &Harness, policy_id: BackupPolicyId) -> RestorePlan {
    harness
        .orchestrator
        .create_restore_plan(
            CreateRestorePlanRequest::new(HOST, "sr-restore", policy_id)
                .with_power_on_after_restore(true),
        )
        .await
        .expect("plan creation should succeed")
}

async fn restore(harness: &Harness, request: RunRestoreNowRequest) -> Run {
    harness
        .orchestrator
        .run_restore_now(request)
        .await
        .expect("restore should be accepted")
        .wait()
        .await
        .expect("restore should finish")
}

fn restored_artifact(harness: &Harness) -> Option<String> {
    harness
        .gateway
        .calls()
        .into_iter()
        .rev()
        .find_map(|call| match call {
            GatewayCall::Restore(job) => Some(job.artifact_path),
            GatewayCall::Backup(_) | GatewayCall::Release { .. } => None,
        })
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_skips_a_newer_failed_run(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let good = harness.backup_now(&policy).await;
    harness
        .gateway
        .fail_vm(policy.vm().id.clone(), "export interrupted");
    let bad = harness.backup_now(&policy).await;
    assert_eq!(bad.status(), RunStatus::Failed);
    let plan = plan_for(&harness, policy.id()).await;

    let run = restore(&harness, RunRestoreNowRequest::latest(plan.id())).await;

    assert_eq!(run.status(), RunStatus::Success);
    assert_eq!(run.source_run_id(), Some(good.id()));
    assert_eq!(
        restored_artifact(&harness).as_deref(),
        good.backup_path()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_picks_the_most_recent_success(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    harness.backup_now(&policy).await;
    let newest = harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;

    let run = restore(&harness, RunRestoreNowRequest::latest(plan.id())).await;

    assert_eq!(run.source_run_id(), Some(newest.id()));
    assert!(run.output_message().starts_with("Restore job started..."));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_without_success_is_not_found(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    harness
        .gateway
        .fail_vm(policy.vm().id.clone(), "no space left on device");
    harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;

    let result = harness
        .orchestrator
        .run_restore_now(RunRestoreNowRequest::latest(plan.id()))
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::NotFound(MissingEntity::SuccessfulBackup(id))) if id == policy.id()
    ));
    assert!(harness.runs_for(RunTarget::Plan(plan.id())).await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_source_is_used_verbatim(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let older = harness.backup_now(&policy).await;
    harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;

    let run = restore(
        &harness,
        RunRestoreNowRequest::from_run(plan.id(), older.id()),
    )
    .await;

    assert_eq!(run.source_run_id(), Some(older.id()));
    assert_eq!(restored_artifact(&harness).as_deref(), older.backup_path());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_failed_source_is_an_invalid_reference(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    harness.backup_now(&policy).await;
    harness
        .gateway
        .fail_vm(policy.vm().id.clone(), "export interrupted");
    let failed = harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;

    let result = harness
        .orchestrator
        .run_restore_now(RunRestoreNowRequest::from_run(plan.id(), failed.id()))
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::InvalidReference {
            run_id,
            reason: InvalidSourceReason::NotSuccessful(RunStatus::Failed),
        }) if run_id == failed.id()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_source_of_another_policy_is_an_invalid_reference(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let other = harness.policy("vm-2", "0 0 * * *", 5).await;
    let foreign = harness.backup_now(&other).await;
    let plan = plan_for(&harness, policy.id()).await;

    let result = harness
        .orchestrator
        .run_restore_now(RunRestoreNowRequest::from_run(plan.id(), foreign.id()))
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::InvalidReference {
            reason: InvalidSourceReason::ForeignPolicy,
            ..
        })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_unknown_source_is_an_invalid_reference(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let plan = plan_for(&harness, policy.id()).await;

    let result = harness
        .orchestrator
        .run_restore_now(RunRestoreNowRequest::from_run(plan.id(), RunId::new()))
        .await;

    assert_eq!(
        result.expect_err("unknown run").kind(),
        ErrorKind::InvalidReference
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ambiguous_selection_is_a_validation_error(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let run = harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;
    let mut request = RunRestoreNowRequest::from_run(plan.id(), run.id());
    request.use_latest = true;

    let result = harness.orchestrator.run_restore_now(request).await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Validation(ValidationError::Selection(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plan_flags_reach_the_gateway(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;
    harness
        .orchestrator
        .update_restore_plan(
            plan.id(),
            RestorePlanPatch {
                preserve: Some(false),
                power_on_after_restore: None,
            },
        )
        .await
        .expect("plan update");

    restore(&harness, RunRestoreNowRequest::latest(plan.id())).await;

    let job = harness
        .gateway
        .calls()
        .into_iter()
        .find_map(|call| match call {
            GatewayCall::Restore(job) => Some(job),
            GatewayCall::Backup(_) | GatewayCall::Release { .. } => None,
        })
        .expect("restore call");
    assert!(!job.preserve);
    assert!(job.power_on_after_restore);
    assert_eq!(job.storage_repository_id.as_str(), "sr-restore");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plan_for_deleted_policy_is_rejected(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    harness
        .orchestrator
        .delete_policy(policy.id())
        .await
        .expect("delete");

    let result = harness
        .orchestrator
        .create_restore_plan(CreateRestorePlanRequest::new(HOST, "sr-1", policy.id()))
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Validation(ValidationError::UnknownPolicy(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_plan_cannot_run(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;
    harness
        .orchestrator
        .delete_restore_plan(plan.id())
        .await
        .expect("delete");

    let result = harness
        .orchestrator
        .run_restore_now(RunRestoreNowRequest::latest(plan.id()))
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::NotFound(MissingEntity::Plan(_)))
    ));
    assert!(
        harness
            .orchestrator
            .list_restore_plans()
            .await
            .expect("list")
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn restore_history_belongs_to_the_live_plan(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let source = harness.backup_now(&policy).await;
    let plan = plan_for(&harness, policy.id()).await;
    let first = restore(&harness, RunRestoreNowRequest::latest(plan.id())).await;
    let second = restore(
        &harness,
        RunRestoreNowRequest::from_run(plan.id(), source.id()),
    )
    .await;

    let fetched = harness
        .orchestrator
        .get_restore_plan(plan.id())
        .await
        .expect("plan lookup");
    let history = harness
        .orchestrator
        .list_restore_runs(plan.id())
        .await
        .expect("restore history");

    assert_eq!(fetched, plan);
    assert_eq!(history.len(), 2);
    for run in [&first, &second] {
        assert!(history.iter().any(|stored| stored.id() == run.id()));
    }
    assert!(
        history
            .iter()
            .all(|run| run.source_run_id() == Some(source.id()) && run.status() == RunStatus::Success)
    );

    harness
        .orchestrator
        .delete_restore_plan(plan.id())
        .await
        .expect("delete");
    let after_delete = harness.orchestrator.list_restore_runs(plan.id()).await;
    assert!(matches!(
        after_delete,
        Err(OrchestratorError::NotFound(MissingEntity::Plan(id))) if id == plan.id()
    ));
}
