//! `PostgreSQL` adapters for restore plan persistence.

mod models;
mod repository;
mod schema;

pub use repository::PostgresRestorePlanRepository;
