//! Synchronization between thread and interrupt context

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-slot wake signal
///
/// Bridges a completion delivered in interrupt context to the one caller
/// blocked in thread context. The completion side calls
/// [`release`](Self::release) exactly once per finished write; the
/// blocked writer consumes the signal with [`acquire`](Self::acquire).
/// At most one thread may wait at a time, matching the single-writer
/// protocol.
pub(crate) struct Notification {
    signaled: AtomicBool,
}

impl Notification {
    pub const fn new() -> Self {
        Notification {
            signaled: AtomicBool::new(false),
        }
    }

    /// Wake the waiting context.
    ///
    /// Releasing while already signaled would lose a wakeup; the
    /// one-release-per-write protocol rules that out.
    pub fn release(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    /// Spin until released, consuming the signal.
    pub fn acquire(&self) {
        while self
            .signaled
            .compare_exchange(true, false, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
    }
}

/// Try-acquire exclusion flag with single-owner semantics
///
/// The sole admission gate for a write: the winner holds the returned
/// guard for the duration of its transfer, and a losing contender
/// observes `None` immediately rather than queueing.
pub(crate) struct WriteLock {
    held: AtomicBool,
}

impl WriteLock {
    pub const fn new() -> Self {
        WriteLock {
            held: AtomicBool::new(false),
        }
    }

    /// Claim the lock if it is free. Never blocks.
    pub fn try_acquire(&self) -> Option<WriteGuard<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
            .then(|| WriteGuard { lock: self })
    }
}

/// Releases the owning [`WriteLock`] on drop, on every exit path.
pub(crate) struct WriteGuard<'a> {
    lock: &'a WriteLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::{Notification, WriteLock};

    #[test]
    fn notification_release_then_acquire() {
        let notification = Notification::new();
        notification.release();
        // Consumes the signal without spinning.
        notification.acquire();
    }

    #[test]
    fn notification_signal_is_consumed() {
        let notification = Notification::new();
        notification.release();
        notification.acquire();
        notification.release();
        notification.acquire();
    }

    #[test]
    fn write_lock_single_owner() {
        let lock = WriteLock::new();
        let guard = lock.try_acquire().expect("lock starts free");
        assert!(lock.try_acquire().is_none());
        drop(guard);
        assert!(lock.try_acquire().is_some());
    }
}
