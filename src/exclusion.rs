//! Fair FIFO exclusion for read-modify-write bodies.
//!
//! Every handler that reads and then writes the collection does so inside a
//! single exclusive body. Waiters are served in arrival order (tokio's mutex
//! is fair). The lock is not reentrant: acquiring it again from inside a
//! running body deadlocks, so each logical operation must be exactly one body.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Capability proving the holder is inside an exclusive body.
///
/// The lock goes to the next waiter once every handle to it is dropped.
#[derive(Debug)]
pub struct ExclusionGuard {
    _guard: Arc<OwnedMutexGuard<()>>,
}

impl ExclusionGuard {
    fn share(&self) -> Self {
        Self {
            _guard: Arc::clone(&self._guard),
        }
    }
}

/// Process-wide mutual exclusion with FIFO hand-off
#[derive(Debug, Clone, Default)]
pub struct ExclusionLock {
    inner: Arc<Mutex<()>>,
}

impl ExclusionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue for the lock and wait for our turn
    pub async fn acquire(&self) -> ExclusionGuard {
        ExclusionGuard {
            _guard: Arc::new(Arc::clone(&self.inner).lock_owned().await),
        }
    }

    /// Run `body` while holding the lock.
    ///
    /// The lock is held until the body's future completes, even if the body
    /// drops its guard early or never names it. It is released on every
    /// exit path, including `Err` and a panic unwinding through the body.
    pub async fn run_exclusive<F, Fut, T>(&self, body: F) -> T
    where
        F: FnOnce(ExclusionGuard) -> Fut,
        Fut: Future<Output = T>,
    {
        let held = self.acquire().await;
        let out = body(held.share()).await;
        drop(held);
        out
    }

    #[cfg(test)]
    fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
