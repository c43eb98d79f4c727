//! Registry of hypervisor hosts known to the orchestrator.
//!
//! Policies and restore plans may only reference hosts present in the
//! directory. Host records themselves are managed elsewhere; the
//! orchestrator only asks whether an address exists.

mod directory;
mod memory;

pub use directory::{HostDirectory, HostDirectoryError, HostDirectoryResult};
#[cfg(test)]
pub use directory::MockHostDirectory;
pub use memory::InMemoryHostDirectory;
