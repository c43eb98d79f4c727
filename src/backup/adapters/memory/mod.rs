//! In-memory adapters for the backup policy catalog.

mod policy;

pub use policy::InMemoryBackupPolicyRepository;
