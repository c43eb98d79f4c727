//! Domain model for backup policies.
//!
//! Policies carry validated scalars only; cron parsing and retention bounds
//! are enforced at construction so the scheduler can trust every registered
//! schedule.

mod error;
mod ids;
mod policy;
mod retention;
mod schedule;

pub use error::BackupDomainError;
pub use ids::{BackupPolicyId, HostAddress, StorageRepositoryId, VmId};
pub use policy::{
    BackupPolicy, BackupPolicyDraft, BackupPolicyPatch, PersistedBackupPolicyData,
    StorageRepository, VirtualMachine,
};
pub use retention::Retention;
pub use schedule::{CronSchedule, truncate_to_minute};
