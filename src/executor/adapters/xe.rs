//! Gateway that drives XCP-ng/XenServer hosts through `xe` command scripts.
//!
//! Scripts are rendered locally and executed through a [`RemoteShell`]. Any
//! output on standard error marks the job as failed; standard output is kept
//! as the job output.

use crate::backup::domain::HostAddress;
use crate::executor::ports::{
    BackupJob, GatewayError, GatewayOutcome, GatewayResult, HypervisorGateway, RemoteShell,
    RestoreJob, ShellError, ShellOutput, artifact_directory_for, artifact_path_for,
};
use crate::shell::{shell_arg, shell_escape};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// [`HypervisorGateway`] that issues `xe` CLI scripts over a remote shell.
#[derive(Debug)]
pub struct XeCommandGateway<S: RemoteShell> {
    shell: Arc<S>,
}

impl<S: RemoteShell> Clone for XeCommandGateway<S> {
    fn clone(&self) -> Self {
        Self {
            shell: Arc::clone(&self.shell),
        }
    }
}

impl<S: RemoteShell> XeCommandGateway<S> {
    /// Creates a gateway over the given shell transport.
    #[must_use]
    pub const fn new(shell: Arc<S>) -> Self {
        Self { shell }
    }

    /// Renders the snapshot, export, and cleanup script for a backup.
    #[must_use]
    pub fn backup_script(job: &BackupJob) -> String {
        let label = job.run_id.to_string();
        let directory = artifact_directory_for(&job.storage_repository_id, &job.vm_id);
        let artifact = artifact_path_for(job);
        [
            format!(
                "xe vm-snapshot {} {}",
                shell_arg("uuid", job.vm_id.as_str()),
                shell_arg("new-name-label", &label)
            ),
            format!(
                "SNAP_UUID=$(xe snapshot-list {} --minimal)",
                shell_arg("name-label", &label)
            ),
            String::from(
                "xe template-param-set is-a-template=false ha-always-run=false uuid=\"$SNAP_UUID\"",
            ),
            format!("mkdir -p {}", shell_escape(&directory)),
            format!(
                "xe vm-export uuid=\"$SNAP_UUID\" {} --compress",
                shell_arg("filename", &artifact)
            ),
            String::from("xe snapshot-uninstall snapshot-uuid=\"$SNAP_UUID\" force=true"),
        ]
        .join("\n")
    }

    /// Renders the import script for a restore, with an optional start.
    #[must_use]
    pub fn restore_script(job: &RestoreJob) -> String {
        let mut lines = vec![
            format!(
                "VM_UUID=$(xe vm-import {} {} preserve={})",
                shell_arg("filename", &job.artifact_path),
                shell_arg("sr-uuid", job.storage_repository_id.as_str()),
                job.preserve
            ),
            String::from("echo \"$VM_UUID\""),
        ];
        if job.power_on_after_restore {
            lines.push(String::from("xe vm-start uuid=\"$VM_UUID\""));
        }
        lines.join("\n")
    }

    async fn exec(&self, host: &HostAddress, script: &str) -> GatewayResult<ShellOutput> {
        debug!(host = %host, "sending xe script");
        self.shell
            .exec(host, script)
            .await
            .map_err(|err| match err {
                ShellError::Connection { host: target, reason } => GatewayError::Unreachable {
                    host: target,
                    reason,
                },
                ShellError::Transport(_) => GatewayError::transport(err),
            })
    }
}

fn outcome_from(output: ShellOutput) -> GatewayOutcome {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        GatewayOutcome::success(output.stdout.trim())
    } else {
        GatewayOutcome::failure(stderr)
    }
}

#[async_trait]
impl<S: RemoteShell> HypervisorGateway for XeCommandGateway<S> {
    async fn backup(&self, job: &BackupJob) -> GatewayResult<GatewayOutcome> {
        let output = self.exec(&job.host, &Self::backup_script(job)).await?;
        let outcome = outcome_from(output);
        if outcome.succeeded {
            return Ok(outcome.with_artifact_path(artifact_path_for(job)));
        }
        Ok(outcome)
    }

    async fn restore(&self, job: &RestoreJob) -> GatewayResult<GatewayOutcome> {
        let output = self.exec(&job.host, &Self::restore_script(job)).await?;
        Ok(outcome_from(output))
    }

    async fn release_artifact(
        &self,
        host: &HostAddress,
        artifact_path: &str,
    ) -> GatewayResult<()> {
        let script = format!("rm -f {}", shell_escape(artifact_path));
        let output = self.exec(host, &script).await?;
        let stderr = output.stderr.trim();
        if stderr.is_empty() {
            return Ok(());
        }
        Err(GatewayError::CommandFailed {
            host: host.clone(),
            output: stderr.to_owned(),
        })
    }
}
