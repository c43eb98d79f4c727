//! Orchestrator facade.
//!
//! [`Orchestrator`] is the single entry point a transport layer (HTTP API,
//! CLI) talks to. It validates requests, keeps the scheduler in step with
//! the policy catalog, and hands runs to the executor. Every operation is
//! pull-based: callers poll [`Orchestrator::get_run`] or await a
//! [`RunHandle`](crate::executor::services::RunHandle).

mod error;
mod reports;
mod requests;
mod service;

pub use error::{
    ErrorKind, MissingEntity, OrchestratorError, OrchestratorResult, ValidationError,
};
pub use reports::{BackupVersion, CreatedPolicy, RunReport};
pub use requests::{RunBackupNowRequest, RunRestoreNowRequest};
pub use service::{Orchestrator, OrchestratorHandle, OrchestratorParts};
