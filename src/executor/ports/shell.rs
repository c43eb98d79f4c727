//! Remote command execution port used by the `xe` gateway.

use crate::backup::domain::HostAddress;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Captured output of a remote script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

/// Runs shell scripts on a hypervisor host.
///
/// Implementations own the transport (usually SSH) and the credentials for
/// each host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Runs `script` on `host` and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] when the script could not be started.
    async fn exec(&self, host: &HostAddress, script: &str) -> Result<ShellOutput, ShellError>;
}

/// Errors raised by remote shell implementations.
#[derive(Debug, Clone, Error)]
pub enum ShellError {
    /// The connection to the host failed.
    #[error("connection to {host} failed: {reason}")]
    Connection {
        /// Target host.
        host: HostAddress,
        /// Transport diagnostic.
        reason: String,
    },

    /// Transport-layer failure.
    #[error("remote shell error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl ShellError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
