//! In-memory adapters for run persistence.

mod run;

pub use run::InMemoryRunRepository;
