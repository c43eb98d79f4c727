//! Diesel schema for backup policy persistence.

diesel::table! {
    /// Backup policy records, soft-deleted via `deleted_at`.
    backup_policies (id) {
        /// Policy identifier.
        id -> Uuid,
        /// Policy name.
        #[max_length = 255]
        name -> Varchar,
        /// Free-text description.
        description -> Text,
        /// Destination storage repository identifier.
        #[max_length = 255]
        storage_repository_id -> Varchar,
        /// Destination storage repository display name.
        #[max_length = 255]
        storage_repository_name -> Varchar,
        /// Source VM identifier.
        #[max_length = 255]
        vm_id -> Varchar,
        /// Source VM display name.
        #[max_length = 255]
        vm_name -> Varchar,
        /// Source host address.
        #[max_length = 255]
        host -> Varchar,
        /// Scheduler activation flag.
        active -> Bool,
        /// Successful backups to keep.
        retention -> Int8,
        /// Five-field cron expression.
        #[max_length = 255]
        cron_schedule -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Soft-deletion timestamp.
        deleted_at -> Nullable<Timestamptz>,
    }
}
