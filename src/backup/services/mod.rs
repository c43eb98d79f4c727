//! Service layer for the backup policy catalog.

mod catalog;

pub use catalog::{
    BackupPolicyCatalogError, BackupPolicyCatalogResult, BackupPolicyService,
    CreateBackupPolicyRequest,
};
