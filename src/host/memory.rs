//! In-memory host directory.

use super::{HostDirectory, HostDirectoryError, HostDirectoryResult};
use crate::backup::domain::HostAddress;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// Thread-safe set of known host addresses.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHostDirectory {
    hosts: Arc<RwLock<HashSet<HostAddress>>>,
}

impl InMemoryHostDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory seeded with the given hosts.
    #[must_use]
    pub fn with_hosts(hosts: impl IntoIterator<Item = HostAddress>) -> Self {
        Self {
            hosts: Arc::new(RwLock::new(hosts.into_iter().collect())),
        }
    }

    /// Registers a host address.
    ///
    /// # Errors
    ///
    /// Returns [`HostDirectoryError::Backend`] when the lock is poisoned.
    pub fn add(&self, host: HostAddress) -> HostDirectoryResult<()> {
        let mut hosts = self.hosts.write().map_err(|err| {
            HostDirectoryError::backend(std::io::Error::other(err.to_string()))
        })?;
        hosts.insert(host);
        Ok(())
    }
}

#[async_trait]
impl HostDirectory for InMemoryHostDirectory {
    async fn contains(&self, host: &HostAddress) -> HostDirectoryResult<bool> {
        let hosts = self.hosts.read().map_err(|err| {
            HostDirectoryError::backend(std::io::Error::other(err.to_string()))
        })?;
        Ok(hosts.contains(host))
    }
}
