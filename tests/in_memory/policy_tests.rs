//! Backup policy catalog operations through the orchestrator.

use super::helpers::{HOST, Harness, OTHER_HOST, harness, host};
use rstest::rstest;
use strongroom::backup::domain::BackupPolicyPatch;
use strongroom::backup::services::CreateBackupPolicyRequest;
use strongroom::orchestrator::{ErrorKind, MissingEntity, OrchestratorError, ValidationError};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_echoes_storage_repository(harness: Harness) {
    let created = harness
        .orchestrator
        .create_policy(
            CreateBackupPolicyRequest::new("nightly", HOST, "vm-1", "sr-1", "0 0 * * *", 3)
                .with_storage_repository_name("Local storage"),
        )
        .await
        .expect("policy creation should succeed");

    assert_eq!(created.storage_repository.name, "Local storage");
    assert_eq!(&created.storage_repository, created.policy.storage_repository());
    assert_eq!(
        harness
            .orchestrator
            .get_policy(created.policy.id())
            .await
            .expect("lookup"),
        created.policy
    );
}

#[rstest]
#[case("* * * * *", true)]
#[case("0 2 * * 1-5", true)]
#[case("not-a-cron", false)]
#[case("0 0 0 * * *", false)]
#[tokio::test(flavor = "multi_thread")]
async fn cron_is_validated_at_creation(
    harness: Harness,
    #[case] cron: &str,
    #[case] accepted: bool,
) {
    let result = harness
        .orchestrator
        .create_policy(CreateBackupPolicyRequest::new(
            "probe", HOST, "vm-1", "sr-1", cron, 1,
        ))
        .await;

    if accepted {
        assert!(result.is_ok(), "expected {cron} to be accepted: {result:?}");
    } else {
        let err = result.expect_err("malformed cron should be rejected");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(
            harness
                .orchestrator
                .list_policies(None)
                .await
                .expect("list")
                .is_empty()
        );
    }
}

#[rstest]
#[case(0)]
#[case(-1)]
#[tokio::test(flavor = "multi_thread")]
async fn non_positive_retention_is_rejected(harness: Harness, #[case] retention: i64) {
    let result = harness
        .orchestrator
        .create_policy(CreateBackupPolicyRequest::new(
            "probe", HOST, "vm-1", "sr-1", "0 0 * * *", retention,
        ))
        .await;

    assert!(matches!(result, Err(OrchestratorError::Validation(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_host_is_a_validation_error(harness: Harness) {
    let result = harness
        .orchestrator
        .create_policy(CreateBackupPolicyRequest::new(
            "stray", "192.0.2.1", "vm-1", "sr-1", "0 0 * * *", 1,
        ))
        .await;

    assert!(matches!(
        result,
        Err(OrchestratorError::Validation(ValidationError::UnknownHost(_)))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_host(harness: Harness) {
    let local = harness.policy("vm-1", "0 0 * * *", 1).await;
    harness
        .orchestrator
        .create_policy(CreateBackupPolicyRequest::new(
            "remote", OTHER_HOST, "vm-2", "sr-2", "0 0 * * *", 1,
        ))
        .await
        .expect("policy creation should succeed");

    let filtered = harness
        .orchestrator
        .list_policies(Some(&host(HOST)))
        .await
        .expect("list");
    let all = harness.orchestrator.list_policies(None).await.expect("list");

    assert_eq!(filtered, vec![local]);
    assert_eq!(all.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_rejects_bad_cron_and_keeps_the_old_schedule(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 1).await;

    let result = harness
        .orchestrator
        .update_policy(
            policy.id(),
            BackupPolicyPatch::default()
                .with_cron_schedule("every day")
                .with_retention(5),
        )
        .await;

    assert_eq!(
        result.expect_err("bad cron should be rejected").kind(),
        ErrorKind::Validation
    );
    let stored = harness
        .orchestrator
        .get_policy(policy.id())
        .await
        .expect("lookup");
    assert_eq!(stored.schedule().as_str(), "0 0 * * *");
    assert_eq!(stored.retention().value(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_is_soft_and_keeps_run_history(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 2).await;
    let run = harness.backup_now(&policy).await;

    let deleted = harness
        .orchestrator
        .delete_policy(policy.id())
        .await
        .expect("delete should succeed");

    assert!(deleted.is_deleted());
    assert!(!deleted.is_active());
    assert!(matches!(
        harness.orchestrator.get_policy(policy.id()).await,
        Err(OrchestratorError::NotFound(MissingEntity::Policy(_)))
    ));
    let history = harness
        .orchestrator
        .list_backup_runs(policy.id())
        .await
        .expect("history stays readable");
    assert_eq!(history.len(), 1);
    assert_eq!(history.first().map(|kept| kept.id()), Some(run.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn backup_versions_list_successful_runs_newest_first(harness: Harness) {
    let policy = harness.policy("vm-1", "0 0 * * *", 5).await;
    let first = harness.backup_now(&policy).await;
    harness
        .gateway
        .fail_vm(policy.vm().id.clone(), "VM_BAD_POWER_STATE");
    harness.backup_now(&policy).await;
    harness.gateway.heal_vm(&policy.vm().id);
    let third = harness.backup_now(&policy).await;

    let versions = harness
        .orchestrator
        .list_backup_versions(policy.id())
        .await
        .expect("versions");

    let ids: Vec<_> = versions.iter().map(|version| version.run_id).collect();
    assert_eq!(ids, vec![third.id(), first.id()]);
    assert!(
        versions
            .iter()
            .all(|version| version.backup_path.ends_with(".xva"))
    );
}
