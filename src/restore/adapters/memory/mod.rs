//! In-memory adapters for the restore plan catalog.

mod plan;

pub use plan::InMemoryRestorePlanRepository;
