//! Domain model for restore plans and source resolution.

mod error;
mod ids;
mod plan;
mod resolve;

pub use error::{InvalidSourceReason, ResolveSourceError, RestoreDomainError};
pub use ids::RestorePlanId;
pub use plan::{PersistedRestorePlanData, RestoreOptions, RestorePlan, RestorePlanPatch};
pub use resolve::{SourceSelection, resolve_source};
