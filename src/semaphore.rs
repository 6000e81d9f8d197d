//! Counting semaphore with a lock-free uncontended path.

use std::sync::atomic::{AtomicI32, Ordering};

use parking_lot::{Condvar, Mutex};

/// A counting semaphore whose uncontended path is a single atomic
/// read-modify-write.
///
/// The outer signed counter tracks credits; a negative value means waiters
/// are asleep on the inner kernel-backed semaphore. [`post`](Semaphore::post)
/// only touches the inner semaphore when a waiter must actually be woken, so
/// it is safe to call from a realtime audio callback.
///
/// There is no cancellation primitive; a shutdown path cancels waiters by
/// posting once per potential sleeper.
#[derive(Default)]
pub struct Semaphore {
    count: AtomicI32,
    inner: InnerSemaphore,
}

impl Semaphore {
    /// Creates a semaphore with no credits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one credit, waking a sleeping waiter if there is one.
    ///
    /// Wait-free unless a waiter is asleep; never allocates.
    pub fn post(&self) {
        let prior = self.count.fetch_add(1, Ordering::Release);
        if prior < 0 {
            self.inner.post();
        }
    }

    /// Takes one credit, blocking until one is available.
    pub fn wait(&self) {
        let prior = self.count.fetch_sub(1, Ordering::Acquire);
        if prior < 1 {
            self.inner.wait();
        }
    }
}

/// Conventional mutex + condvar semaphore backing the contended path.
#[derive(Default)]
struct InnerSemaphore {
    count: Mutex<u32>,
    available: Condvar,
}

impl InnerSemaphore {
    fn post(&self) {
        {
            let mut count = self.count.lock();
            *count += 1;
        }
        self.available.notify_one();
    }

    fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }
}
