use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

/// We define various kinds of latches, which are all a primitive signaling
/// mechanism. A latch starts as false. Eventually someone calls `set()` and
/// it becomes true. You can test if it has been set by calling `is_set()`.
pub trait Latch {
    /// Set the latch, signalling others.
    fn set(&self);
    /// Test if the latch is set.
    fn is_set(&self) -> bool;
}

/// A Latch starts as false and eventually becomes true. You can block until
/// it becomes true.
#[derive(Debug, Default)]
pub struct LockLatch {
    m: Mutex<bool>,
    v: Condvar,
}

impl LockLatch {
    #[inline]
    pub fn new() -> LockLatch {
        LockLatch {
            m: Mutex::new(false),
            v: Condvar::new(),
        }
    }

    /// Block until latch is set.
    pub fn wait(&self) {
        let mut guard = self.m.lock().unwrap_or_else(PoisonError::into_inner);
        while !*guard {
            guard = self.v.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Latch for LockLatch {
    #[inline]
    fn set(&self) {
        let mut guard = self.m.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = true;
        self.v.notify_all();
    }

    #[inline]
    fn is_set(&self) -> bool {
        *self.m.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counting latches are used to track outstanding groups of dispatches. Unlike
/// other latches, calling `set()` does not necessarily make the latch be
/// considered `set()`; instead, it just decrements the counter. The latch is
/// only "set" (in the sense that`is_set()` returns true) once the counter
/// reaches zero.
#[derive(Debug, Default)]
pub struct CountLatch {
    counter: AtomicUsize,
}

impl CountLatch {
    #[inline]
    pub fn new() -> CountLatch {
        CountLatch {
            counter: AtomicUsize::new(0),
        }
    }

    /// Adds `n` outstanding units of work.
    #[inline]
    pub fn add(&self, n: usize) {
        self.counter.fetch_add(n, Ordering::SeqCst);
    }

    /// Returns the number of outstanding units of work.
    #[inline]
    pub fn pending(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Latch for CountLatch {
    #[inline]
    fn is_set(&self) -> bool {
        // Need to acquire any memory reads before latch was set:
        self.counter.load(Ordering::SeqCst) == 0
    }

    #[inline]
    fn set(&self) {
        let prev = self.counter.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "count latch underflow");
    }
}
