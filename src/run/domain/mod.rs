//! Domain model for run records.

mod error;
mod ids;
mod run;
mod status;

pub use error::{ParseRunStatusError, ParseTriggerKindError, RunDomainError};
pub use ids::RunId;
pub use run::{PersistedRunData, Run, RunKind, RunTarget};
pub use status::{RunStatus, TriggerKind};
