//! Given steps for backup orchestration BDD scenarios.

use super::world::{BackupWorld, HOST, at, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use strongroom::backup::domain::BackupPolicyPatch;
use strongroom::backup::services::CreateBackupPolicyRequest;
use strongroom::executor::adapters::InMemoryHypervisorGateway;
use strongroom::orchestrator::RunBackupNowRequest;
use strongroom::restore::services::CreateRestorePlanRequest;
use strongroom::run::domain::{Run, RunStatus};

#[given("the hypervisor holds every job until released")]
fn gated_hypervisor(world: &mut BackupWorld) {
    *world = BackupWorld::with_gateway(InMemoryHypervisorGateway::gated());
}

#[given(r#"an active policy for "{vm}" with schedule "{cron}" and retention {retention:i64}"#)]
fn active_policy(
    world: &mut BackupWorld,
    vm: String,
    cron: String,
    retention: i64,
) -> Result<(), eyre::Report> {
    let created = run_async(world.orchestrator.create_policy(CreateBackupPolicyRequest::new(
        format!("backup-{vm}"),
        HOST,
        vm,
        "sr-1",
        cron,
        retention,
    )))
    .wrap_err("create scenario policy")?;
    world.policy = Some(created.policy);
    Ok(())
}

#[given("the policy is deactivated")]
fn deactivate_policy(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let policy_id = world.policy()?.id();
    let updated = run_async(
        world
            .orchestrator
            .update_policy(policy_id, BackupPolicyPatch::default().with_active(false)),
    )
    .wrap_err("deactivate policy")?;
    world.policy = Some(updated);
    Ok(())
}

#[given("a successful backup of that policy")]
fn successful_backup(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let run = backup_now(world)?;
    if run.status() != RunStatus::Success {
        return Err(eyre::eyre!("expected a successful backup, got {:?}", run.status()));
    }
    world.successful_backup = Some(run);
    Ok(())
}

#[given("a failed backup of that policy")]
fn failed_backup(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let vm_id = world.policy()?.vm().id.clone();
    world.gateway.fail_vm(vm_id.clone(), "export interrupted");
    let run = backup_now(world)?;
    world.gateway.heal_vm(&vm_id);
    if run.status() != RunStatus::Failed {
        return Err(eyre::eyre!("expected a failed backup, got {:?}", run.status()));
    }
    Ok(())
}

#[given("a restore plan for that policy")]
fn restore_plan(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let policy_id = world.policy()?.id();
    let plan = run_async(
        world
            .orchestrator
            .create_restore_plan(CreateRestorePlanRequest::new(HOST, "sr-restore", policy_id)),
    )
    .wrap_err("create restore plan")?;
    world.plan = Some(plan);
    Ok(())
}

#[given("a scheduled backup of that policy is in progress")]
fn scheduled_backup_in_progress(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let handles = run_async(world.orchestrator.tick_now(at(19, 0, 0)?));
    if handles.len() != 1 {
        return Err(eyre::eyre!("expected one scheduled run, got {}", handles.len()));
    }
    world.in_flight.extend(handles);
    Ok(())
}

fn backup_now(world: &BackupWorld) -> Result<Run, eyre::Report> {
    let policy_id = world.policy()?.id();
    run_async(async {
        let handle = world
            .orchestrator
            .run_backup_now(RunBackupNowRequest::new(policy_id))
            .await
            .wrap_err("submit manual backup")?;
        handle.wait().await.wrap_err("wait for manual backup")
    })
}
