//! Port contracts for talking to hypervisor hosts.

pub mod gateway;
pub mod shell;

pub use gateway::{
    BackupJob, GatewayError, GatewayOutcome, GatewayResult, HypervisorGateway, RestoreJob,
    artifact_directory_for, artifact_path_for,
};
pub use shell::{RemoteShell, ShellError, ShellOutput};
