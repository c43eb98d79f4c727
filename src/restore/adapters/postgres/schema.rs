//! Diesel schema for restore plan persistence.

diesel::table! {
    /// Restore plan records, soft-deleted via `deleted_at`.
    restore_plans (id) {
        /// Plan identifier.
        id -> Uuid,
        /// Destination host address.
        #[max_length = 255]
        host -> Varchar,
        /// Destination storage repository identifier.
        #[max_length = 255]
        storage_repository_id -> Varchar,
        /// Source backup policy.
        policy_id -> Uuid,
        /// Preserve VM identity on import.
        preserve -> Bool,
        /// Start the VM after import.
        power_on_after_restore -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Soft-deletion timestamp.
        deleted_at -> Nullable<Timestamptz>,
    }
}
