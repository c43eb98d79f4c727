//! Diesel row models for restore plan persistence.

use super::schema::restore_plans;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result, insert, and update row for restore plans.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = restore_plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct RestorePlanRow {
    /// Plan identifier.
    pub id: uuid::Uuid,
    /// Destination host address.
    pub host: String,
    /// Destination storage repository identifier.
    pub storage_repository_id: String,
    /// Source backup policy.
    pub policy_id: uuid::Uuid,
    /// Preserve VM identity on import.
    pub preserve: bool,
    /// Start the VM after import.
    pub power_on_after_restore: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}
