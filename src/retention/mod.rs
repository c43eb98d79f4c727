//! Pruning of historical backup artifacts.
//!
//! After each successful backup the enforcer keeps the policy's newest
//! `retention` successful runs and prunes the rest: the artifact is released
//! on the host first, then the run row is deleted. Failed and in-flight runs
//! are never counted or pruned. Runs pinned as the source of an in-flight
//! restore are deferred to a later pass.

mod enforcer;
mod pins;
mod plan;

pub use enforcer::{RetentionEnforcer, RetentionError, RetentionReport};
pub use pins::{ArtifactPins, PinSet};
pub use plan::select_for_pruning;
