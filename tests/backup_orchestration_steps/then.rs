//! Then steps for backup orchestration BDD scenarios.

use super::world::{BackupWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::then;
use strongroom::orchestrator::{ErrorKind, OrchestratorError};
use strongroom::run::domain::{RunStatus, RunTarget};
use strongroom::run::ports::RunRepository;

#[then("the policy keeps {count:usize} backup runs")]
fn policy_keeps_runs(world: &mut BackupWorld, count: usize) -> Result<(), eyre::Report> {
    let target = RunTarget::Policy(world.policy()?.id());
    let runs = run_async(world.runs.list_for_target(target)).wrap_err("list policy runs")?;
    if runs.len() != count {
        return Err(eyre::eyre!("expected {count} runs, found {}", runs.len()));
    }
    Ok(())
}

#[then("the first night's artifact has been released")]
fn first_artifact_released(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let first = world
        .nightly_runs
        .first()
        .ok_or_else(|| eyre::eyre!("no nightly runs recorded"))?;
    let path = first
        .backup_path()
        .ok_or_else(|| eyre::eyre!("first nightly run has no artifact"))?;
    if world.gateway.artifacts().iter().any(|artifact| artifact == path) {
        return Err(eyre::eyre!("artifact {path} is still stored"));
    }
    Ok(())
}

#[then("the restore succeeds from the successful backup")]
fn restore_uses_successful_backup(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let restore = world
        .last_restore
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing restore run"))?;
    let expected = world
        .successful_backup
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing successful backup"))?;
    if restore.status() != RunStatus::Success {
        return Err(eyre::eyre!("restore finished as {:?}", restore.status()));
    }
    if restore.source_run_id() != Some(expected.id()) {
        return Err(eyre::eyre!(
            "restore used {:?} instead of {}",
            restore.source_run_id(),
            expected.id()
        ));
    }
    Ok(())
}

#[then("the request is rejected as a conflict")]
fn request_conflicts(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    match world.last_submission.take() {
        Some(Err(OrchestratorError::Conflict(_))) => Ok(()),
        Some(Err(other)) => Err(eyre::eyre!("expected a conflict, got {other}")),
        Some(Ok(_)) => Err(eyre::eyre!("expected a conflict, but a run started")),
        None => Err(eyre::eyre!("no submission recorded")),
    }
}

#[then("releasing the hypervisor lets the scheduled backup succeed")]
fn release_scheduled_backup(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    world.gateway.open_gate(world.in_flight.len());
    for handle in world.in_flight.drain(..) {
        let run = run_async(handle.wait()).wrap_err("wait for scheduled backup")?;
        if run.status() != RunStatus::Success {
            return Err(eyre::eyre!("scheduled backup finished as {:?}", run.status()));
        }
    }
    Ok(())
}

#[then("no backup run is recorded")]
fn no_backup_run(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    let target = RunTarget::Policy(world.policy()?.id());
    let runs = run_async(world.runs.list_for_target(target)).wrap_err("list policy runs")?;
    if world.triggered != 0 || !runs.is_empty() {
        return Err(eyre::eyre!(
            "inactive policy triggered {} times with {} runs",
            world.triggered,
            runs.len()
        ));
    }
    Ok(())
}

#[then("the policy is accepted")]
fn policy_accepted(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    match world.last_creation.take() {
        Some(Ok(_)) => Ok(()),
        Some(Err(err)) => Err(eyre::eyre!("policy was rejected: {err}")),
        None => Err(eyre::eyre!("no policy creation recorded")),
    }
}

#[then("the policy is rejected as invalid")]
fn policy_rejected(world: &mut BackupWorld) -> Result<(), eyre::Report> {
    match world.last_creation.take() {
        Some(Err(err)) if err.kind() == ErrorKind::Validation => {}
        Some(Err(err)) => return Err(eyre::eyre!("unexpected error kind: {err}")),
        Some(Ok(_)) => return Err(eyre::eyre!("malformed schedule was accepted")),
        None => return Err(eyre::eyre!("no policy creation recorded")),
    }
    let policies = run_async(world.orchestrator.list_policies(None)).wrap_err("list policies")?;
    if !policies.is_empty() {
        return Err(eyre::eyre!("rejected policy was stored"));
    }
    Ok(())
}
