//! Diesel row models for run persistence.

use super::schema::runs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result, insert, and update row for run records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = runs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct RunRow {
    /// Run identifier.
    pub id: uuid::Uuid,
    /// `backup` or `restore`.
    pub kind: String,
    /// Owning policy for backup runs.
    pub policy_id: Option<uuid::Uuid>,
    /// Owning plan for restore runs.
    pub plan_id: Option<uuid::Uuid>,
    /// Restored backup run for restore runs.
    pub source_run_id: Option<uuid::Uuid>,
    /// Artifact location of a successful backup run.
    pub backup_path: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Trigger provenance.
    pub trigger_kind: String,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Terminal transition timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Accumulated output.
    pub output_message: String,
}
