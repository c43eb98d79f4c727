//! Pins protecting restore sources from pruning.

use crate::run::domain::RunId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Shared registry of backup runs that in-flight restores are reading.
///
/// Restore resolution and retention pruning both work under [`Self::lock`],
/// so a run is either pinned before pruning looks at it or pruned before
/// resolution can select it.
#[derive(Debug, Clone, Default)]
pub struct ArtifactPins {
    pins: Arc<Mutex<HashMap<RunId, usize>>>,
}

/// Exclusive view of the pin registry.
#[derive(Debug)]
pub struct PinSet<'a> {
    pins: MutexGuard<'a, HashMap<RunId, usize>>,
}

impl ArtifactPins {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the registry.
    pub async fn lock(&self) -> PinSet<'_> {
        PinSet {
            pins: self.pins.lock().await,
        }
    }

    /// Drops one pin on `run_id`.
    pub async fn unpin(&self, run_id: RunId) {
        self.lock().await.unpin(run_id);
    }

    /// Returns whether `run_id` is pinned.
    pub async fn is_pinned(&self, run_id: RunId) -> bool {
        self.lock().await.is_pinned(run_id)
    }
}

impl PinSet<'_> {
    /// Adds one pin on `run_id`.
    pub fn pin(&mut self, run_id: RunId) {
        *self.pins.entry(run_id).or_default() += 1;
    }

    /// Drops one pin on `run_id`.
    pub fn unpin(&mut self, run_id: RunId) {
        if let Some(count) = self.pins.get_mut(&run_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.pins.remove(&run_id);
            }
        }
    }

    /// Returns whether `run_id` is pinned.
    #[must_use]
    pub fn is_pinned(&self, run_id: RunId) -> bool {
        self.pins.contains_key(&run_id)
    }
}
