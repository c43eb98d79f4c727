//! `PostgreSQL` adapters for backup policy persistence.

mod models;
mod repository;
mod schema;

pub use repository::PostgresBackupPolicyRepository;
