use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Process-wide stop request shared by the Ctrl+C handler, the console
/// monitor and the hotkey loop.
///
/// Waiting on it instead of sleeping lets the loop exit as soon as a stop is
/// requested, rather than after the current interval.
#[derive(Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    wakeup: Condvar,
    lock: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake every waiter
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wakeup.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` when stopped.
    pub fn wait(&self, duration: Duration) -> bool {
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self
            .wakeup
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok(_) => self.is_shutdown(),
            // Poisoned lock: treat as a stop request
            Err(_) => true,
        }
    }
}
