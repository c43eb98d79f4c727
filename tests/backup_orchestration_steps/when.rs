//! When steps for backup orchestration BDD scenarios.

use super::world::{BackupWorld, HOST, at, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use strongroom::backup::services::CreateBackupPolicyRequest;
use strongroom::orchestrator::{RunBackupNowRequest, RunRestoreNowRequest};

#[when("the scheduler fires on {nights:u32} consecutive nights")]
fn scheduler_fires_nightly(world: &mut BackupWorld, nights: u32) -> Result<(), eyre::Report> {
    for night in 0..nights {
        let midnight = at(19 + night, 0, 0)?;
        let handles = run_async(world.orchestrator.tick_now(midnight));
        for handle in handles {
            let run = run_async(handle.wait()).wrap_err("wait for nightly backup")?;
            world.nightly_runs.push(run);
        }
    }
    Ok(())
}

#[when("the scheduler ticks every minute for {minutes:u32} minutes")]
fn scheduler_ticks_every_minute(world: &mut BackupWorld, minutes: u32) -> Result<(), eyre::Report> {
    for minute in 0..minutes {
        let handles = run_async(world.orchestrator.tick_now(at(19, 1, minute)?));
        world.triggered += handles.len();
    }
    Ok(())
}

#[when("the latest backup is restored")]
fn restore_latest(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let plan_id = world
        .plan
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing restore plan in scenario world"))?
        .id();
    let run = run_async(async {
        let handle = world
            .orchestrator
            .run_restore_now(RunRestoreNowRequest::latest(plan_id))
            .await
            .wrap_err("submit restore")?;
        handle.wait().await.wrap_err("wait for restore")
    })?;
    world.last_restore = Some(run);
    Ok(())
}

#[when("a manual backup is requested")]
fn manual_backup_requested(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let policy_id = world.policy()?.id();
    let result = run_async(
        world
            .orchestrator
            .run_backup_now(RunBackupNowRequest::new(policy_id)),
    );
    world.last_submission = Some(result);
    Ok(())
}

#[when(r#"a policy is created with schedule "{cron}""#)]
fn create_policy_with_schedule(world: &mut BackupWorld, cron: String) {
    let result = run_async(world.orchestrator.create_policy(CreateBackupPolicyRequest::new(
        "probe", HOST, "vm-1", "sr-1", cron, 1,
    )));
    world.last_creation = Some(result);
}
