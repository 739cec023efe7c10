//! Exclusive access to the checked-out working tree.
//!
//! A repository has a single working tree, so sequences that switch branches,
//! merge, or commit must not interleave. Callers hold a [`WorktreeGuard`] for
//! the whole sequence; dropping it (on success, error, or unwind) releases
//! the tree.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct WorktreeLock {
    inner: Mutex<()>,
}

/// Token proving exclusive access to the working tree.
#[must_use = "the working tree is released as soon as the guard is dropped"]
pub struct WorktreeGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    operation: &'static str,
    acquired_at: Instant,
}

impl WorktreeLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the working tree is free.
    pub fn acquire(&self, operation: &'static str) -> WorktreeGuard<'_> {
        let started = Instant::now();
        // A panic mid-sequence leaves the tree in whatever state git left it;
        // the lock itself carries no data, so poisoning is ignored.
        let guard = self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(operation, "worktree lock was poisoned by an earlier panic");
            poisoned.into_inner()
        });
        debug!(
            operation,
            waited_ms = started.elapsed().as_millis() as u64,
            "worktree acquired"
        );
        WorktreeGuard {
            _guard: guard,
            operation,
            acquired_at: Instant::now(),
        }
    }

    /// Acquire only if no other sequence is running.
    #[cfg(test)]
    fn try_acquire(&self, operation: &'static str) -> Option<WorktreeGuard<'_>> {
        let guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => return None,
        };
        Some(WorktreeGuard {
            _guard: guard,
            operation,
            acquired_at: Instant::now(),
        })
    }
}

impl Drop for WorktreeGuard<'_> {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "worktree released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_waits_for_release() {
        let lock = WorktreeLock::new();
        let guard = lock.acquire("publish");
        assert!(lock.try_acquire("git run").is_none());
        drop(guard);
        assert!(lock.try_acquire("git run").is_some());
    }

    #[test]
    fn guard_is_released_on_panic() {
        let lock = WorktreeLock::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = lock.acquire("publish");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(lock.try_acquire("publish").is_some());
    }
}
