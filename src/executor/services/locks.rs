//! Per-target exclusive locks.

use crate::run::domain::RunTarget;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Non-blocking exclusive locks keyed by policy or plan.
///
/// A target holds its lock from before its run row is created until the
/// run, including retention, has finished.
#[derive(Debug, Clone, Default)]
pub struct TargetLocks {
    held: Arc<Mutex<HashSet<RunTarget>>>,
}

/// Lock on one target, released on drop.
#[derive(Debug)]
pub struct TargetGuard {
    target: RunTarget,
    held: Arc<Mutex<HashSet<RunTarget>>>,
}

impl TargetLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `target` unless it is already held.
    #[must_use]
    pub fn try_acquire(&self, target: RunTarget) -> Option<TargetGuard> {
        if !lock_set(&self.held).insert(target) {
            return None;
        }
        Some(TargetGuard {
            target,
            held: Arc::clone(&self.held),
        })
    }

    /// Returns whether `target` is locked.
    #[must_use]
    pub fn is_locked(&self, target: RunTarget) -> bool {
        lock_set(&self.held).contains(&target)
    }
}

impl TargetGuard {
    /// Returns the locked target.
    #[must_use]
    pub const fn target(&self) -> RunTarget {
        self.target
    }
}

impl Drop for TargetGuard {
    fn drop(&mut self) {
        lock_set(&self.held).remove(&self.target);
    }
}

fn lock_set(held: &Mutex<HashSet<RunTarget>>) -> MutexGuard<'_, HashSet<RunTarget>> {
    held.lock().unwrap_or_else(PoisonError::into_inner)
}
