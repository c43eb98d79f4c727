//! Diesel row models for backup policy persistence.

use super::schema::backup_policies;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for backup policy records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = backup_policies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BackupPolicyRow {
    /// Policy identifier.
    pub id: uuid::Uuid,
    /// Policy name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Destination storage repository identifier.
    pub storage_repository_id: String,
    /// Destination storage repository display name.
    pub storage_repository_name: String,
    /// Source VM identifier.
    pub vm_id: String,
    /// Source VM display name.
    pub vm_name: String,
    /// Source host address.
    pub host: String,
    /// Scheduler activation flag.
    pub active: bool,
    /// Successful backups to keep.
    pub retention: i64,
    /// Five-field cron expression.
    pub cron_schedule: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insert and update model for backup policy records.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = backup_policies)]
#[diesel(treat_none_as_null = true)]
pub struct NewBackupPolicyRow {
    /// Policy identifier.
    pub id: uuid::Uuid,
    /// Policy name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Destination storage repository identifier.
    pub storage_repository_id: String,
    /// Destination storage repository display name.
    pub storage_repository_name: String,
    /// Source VM identifier.
    pub vm_id: String,
    /// Source VM display name.
    pub vm_name: String,
    /// Source host address.
    pub host: String,
    /// Scheduler activation flag.
    pub active: bool,
    /// Successful backups to keep.
    pub retention: i64,
    /// Five-field cron expression.
    pub cron_schedule: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}
