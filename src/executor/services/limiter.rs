//! Per-host bound on concurrent gateway calls.

use crate::backup::domain::HostAddress;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hands out gateway permits, at most `per_host` at a time for each host.
#[derive(Debug, Clone)]
pub struct HostLimiter {
    per_host: usize,
    semaphores: Arc<Mutex<HashMap<HostAddress, Arc<Semaphore>>>>,
}

impl HostLimiter {
    /// Creates a limiter allowing `per_host` concurrent calls per host.
    #[must_use]
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host: per_host.max(1),
            semaphores: Arc::default(),
        }
    }

    /// Waits for a permit to call `host`.
    ///
    /// Returns `None` only if the host's semaphore has been closed, which
    /// this limiter never does.
    pub async fn acquire(&self, host: &HostAddress) -> Option<OwnedSemaphorePermit> {
        let semaphore = {
            let mut semaphores = self
                .semaphores
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                semaphores
                    .entry(host.clone())
                    .or_insert_with(|| Arc::new(Semaphore::new(self.per_host))),
            )
        };
        semaphore.acquire_owned().await.ok()
    }
}
