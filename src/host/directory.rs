//! Port for host existence checks.

use crate::backup::domain::HostAddress;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for host directory lookups.
pub type HostDirectoryResult<T> = Result<T, HostDirectoryError>;

/// Lookup contract for known hypervisor hosts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostDirectory: Send + Sync {
    /// Returns whether a host with the given address is registered.
    async fn contains(&self, host: &HostAddress) -> HostDirectoryResult<bool>;
}

/// Errors returned by host directory implementations.
#[derive(Debug, Clone, Error)]
pub enum HostDirectoryError {
    /// Lookup backend failure.
    #[error("host directory error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl HostDirectoryError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
