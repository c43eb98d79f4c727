//! Port contracts for run persistence.

pub mod repository;

pub use repository::{RunRepository, RunRepositoryError, RunRepositoryResult};
