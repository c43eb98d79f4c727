//! Scriptable in-process hypervisor gateway.
//!
//! Backups succeed by default and record their artifact; restores succeed
//! when the artifact exists. Failures, unreachable hosts, and release errors
//! are scripted per VM, host, or path, and a release can be made to hang.
//! An optional gate holds every job until
//! a test releases it, which makes in-flight windows deterministic.

use crate::backup::domain::{HostAddress, VmId};
use crate::executor::ports::{
    BackupJob, GatewayError, GatewayOutcome, GatewayResult, HypervisorGateway, RestoreJob,
    artifact_path_for,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// One call observed by the in-memory gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// A backup export.
    Backup(BackupJob),
    /// A restore import.
    Restore(RestoreJob),
    /// An artifact release.
    Release {
        /// Host owning the artifact.
        host: HostAddress,
        /// Released artifact.
        artifact_path: String,
    },
}

#[derive(Debug, Default)]
struct GatewayState {
    failing_vms: HashMap<VmId, String>,
    artifactless_vms: HashSet<VmId>,
    unreachable_hosts: HashSet<HostAddress>,
    release_failures: HashSet<String>,
    stalled_releases: HashSet<String>,
    artifacts: BTreeSet<String>,
    calls: Vec<GatewayCall>,
    in_flight: HashMap<HostAddress, usize>,
    peak_in_flight: HashMap<HostAddress, usize>,
}

impl GatewayState {
    fn enter(&mut self, host: &HostAddress, call: GatewayCall) -> GatewayResult<()> {
        self.calls.push(call);
        if self.unreachable_hosts.contains(host) {
            return Err(GatewayError::Unreachable {
                host: host.clone(),
                reason: String::from("connection refused"),
            });
        }
        let current = self.in_flight.entry(host.clone()).or_default();
        *current += 1;
        let now_in_flight = *current;
        let peak = self.peak_in_flight.entry(host.clone()).or_default();
        *peak = (*peak).max(now_in_flight);
        Ok(())
    }

    fn leave(&mut self, host: &HostAddress) {
        if let Some(current) = self.in_flight.get_mut(host) {
            *current = current.saturating_sub(1);
        }
    }
}

/// In-process [`HypervisorGateway`] for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHypervisorGateway {
    state: Arc<Mutex<GatewayState>>,
    gate: Option<Arc<Semaphore>>,
}

impl InMemoryHypervisorGateway {
    /// Creates a gateway where every job succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway whose jobs wait for [`Self::open_gate`].
    #[must_use]
    pub fn gated() -> Self {
        Self {
            state: Arc::default(),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// Lets `jobs` more gated jobs complete.
    pub fn open_gate(&self, jobs: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(jobs);
        }
    }

    /// Makes every backup of `vm_id` fail with `output`.
    pub fn fail_vm(&self, vm_id: VmId, output: impl Into<String>) {
        self.state().failing_vms.insert(vm_id, output.into());
    }

    /// Clears scripted failures for `vm_id`.
    pub fn heal_vm(&self, vm_id: &VmId) {
        let mut state = self.state();
        state.failing_vms.remove(vm_id);
        state.artifactless_vms.remove(vm_id);
    }

    /// Makes backups of `vm_id` report success without an artifact path.
    pub fn omit_artifact_for(&self, vm_id: VmId) {
        self.state().artifactless_vms.insert(vm_id);
    }

    /// Makes every call against `host` fail as unreachable.
    pub fn make_unreachable(&self, host: HostAddress) {
        self.state().unreachable_hosts.insert(host);
    }

    /// Makes releasing `artifact_path` fail.
    pub fn fail_release(&self, artifact_path: impl Into<String>) {
        self.state().release_failures.insert(artifact_path.into());
    }

    /// Makes releasing `artifact_path` hang without ever returning.
    pub fn stall_release(&self, artifact_path: impl Into<String>) {
        self.state().stalled_releases.insert(artifact_path.into());
    }

    /// Clears a scripted release failure.
    pub fn allow_release(&self, artifact_path: &str) {
        self.state().release_failures.remove(artifact_path);
    }

    /// Returns the artifacts currently stored.
    #[must_use]
    pub fn artifacts(&self) -> Vec<String> {
        self.state().artifacts.iter().cloned().collect()
    }

    /// Returns every call in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    /// Returns the number of backup calls made for `vm_id`.
    #[must_use]
    pub fn backup_count(&self, vm_id: &VmId) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| matches!(call, GatewayCall::Backup(job) if &job.vm_id == vm_id))
            .count()
    }

    /// Returns the highest number of simultaneous jobs seen for `host`.
    #[must_use]
    pub fn peak_concurrency(&self, host: &HostAddress) -> usize {
        self.state()
            .peak_in_flight
            .get(host)
            .copied()
            .unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn pass_gate(&self) {
        let Some(gate) = &self.gate else {
            return;
        };
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl HypervisorGateway for InMemoryHypervisorGateway {
    async fn backup(&self, job: &BackupJob) -> GatewayResult<GatewayOutcome> {
        self.state()
            .enter(&job.host, GatewayCall::Backup(job.clone()))?;
        self.pass_gate().await;

        let mut state = self.state();
        state.leave(&job.host);
        if let Some(output) = state.failing_vms.get(&job.vm_id) {
            return Ok(GatewayOutcome::failure(output.clone()));
        }
        if state.artifactless_vms.contains(&job.vm_id) {
            return Ok(GatewayOutcome::success("export finished"));
        }
        let path = artifact_path_for(job);
        state.artifacts.insert(path.clone());
        Ok(GatewayOutcome::success(format!("exported {path}")).with_artifact_path(path))
    }

    async fn restore(&self, job: &RestoreJob) -> GatewayResult<GatewayOutcome> {
        self.state()
            .enter(&job.host, GatewayCall::Restore(job.clone()))?;
        self.pass_gate().await;

        let mut state = self.state();
        state.leave(&job.host);
        if !state.artifacts.contains(&job.artifact_path) {
            return Ok(GatewayOutcome::failure(format!(
                "The uri {} could not be opened",
                job.artifact_path
            )));
        }
        Ok(GatewayOutcome::success(format!(
            "imported {} into {}",
            job.artifact_path, job.storage_repository_id
        )))
    }

    async fn release_artifact(
        &self,
        host: &HostAddress,
        artifact_path: &str,
    ) -> GatewayResult<()> {
        let stalled = {
            let mut state = self.state();
            state.calls.push(GatewayCall::Release {
                host: host.clone(),
                artifact_path: artifact_path.to_owned(),
            });
            state.stalled_releases.contains(artifact_path)
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut state = self.state();
        if state.release_failures.contains(artifact_path) {
            return Err(GatewayError::CommandFailed {
                host: host.clone(),
                output: format!("rm: cannot remove '{artifact_path}': Device or resource busy"),
            });
        }
        state.artifacts.remove(artifact_path);
        Ok(())
    }
}
