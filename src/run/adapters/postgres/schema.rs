//! Diesel schema for run persistence.

diesel::table! {
    /// Backup and restore runs in one table, discriminated by `kind`.
    runs (id) {
        /// Run identifier.
        id -> Uuid,
        /// `backup` or `restore`.
        #[max_length = 20]
        kind -> Varchar,
        /// Owning policy for backup runs.
        policy_id -> Nullable<Uuid>,
        /// Owning plan for restore runs.
        plan_id -> Nullable<Uuid>,
        /// Restored backup run for restore runs.
        source_run_id -> Nullable<Uuid>,
        /// Artifact location of a successful backup run.
        backup_path -> Nullable<Text>,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Trigger provenance.
        #[max_length = 20]
        trigger_kind -> Varchar,
        /// Creation timestamp.
        started_at -> Timestamptz,
        /// Terminal transition timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Accumulated output.
        output_message -> Text,
    }
}
