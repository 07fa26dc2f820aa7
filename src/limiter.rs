//! Concurrency limiting for in-flight transfers
//!
//! A [`ConcurrencyLimiter`] hands out at most `N` tokens at a time. Tokens are
//! RAII guards: dropping a [`LimiterPermit`] returns its token, so every exit
//! path of a task (success, failure, panic unwinding) releases it. A caller
//! whose `acquire()` future is dropped before it resolves never held a token
//! and has nothing to release.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounds the number of concurrently running transfers
///
/// Backed by a tokio [`Semaphore`], whose waiters are served in FIFO order,
/// so no task starves while others keep finishing. Cloning shares the same
/// token pool.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    /// Tokens currently held
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` has reached
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `capacity` simultaneous holders
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait until fewer than `capacity` tokens are held, then take one
    ///
    /// Fails only if the limiter has been closed with [`ConcurrencyLimiter::close`].
    pub async fn acquire(&self) -> Result<LimiterPermit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(LimiterPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Stop handing out tokens; pending and future `acquire` calls fail
    ///
    /// Tokens already held stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`ConcurrencyLimiter::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Tokens currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of tokens held at the same time since creation
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A held concurrency token; dropping it releases the token
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl LimiterPermit {
    /// Release the token explicitly (equivalent to dropping the permit)
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        // The counter is decremented before the semaphore permit is returned,
        // so a waiter woken by the release never observes a stale count.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
