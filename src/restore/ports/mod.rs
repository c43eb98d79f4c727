//! Port contracts for the restore plan catalog.

pub mod repository;

pub use repository::{
    RestorePlanRepository, RestorePlanRepositoryError, RestorePlanRepositoryResult,
};
