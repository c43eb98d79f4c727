//! Port contracts for the backup policy catalog.

pub mod repository;

pub use repository::{
    BackupPolicyRepository, BackupPolicyRepositoryError, BackupPolicyRepositoryResult,
};
