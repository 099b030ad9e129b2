//! Cooperative cancellation of a simulation sweep

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token shared between a sweep and whatever can interrupt it
///
/// Clones share the same state, so one clone can be moved into a signal handler while the sweep
/// polls another. The sweep arms the token when it starts, which discards any stale request, and
/// checks it once per frame; requests made while the token is disarmed are ignored.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    armed: Arc<AtomicBool>,
    triggered: Arc<AtomicBool>,
}

impl Interrupt {
    /// Returns disarmed token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears any pending request and starts accepting new ones.
    pub fn arm(&self) {
        self.triggered.store(false, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Stops accepting requests and clears any pending one.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
        self.triggered.store(false, Ordering::SeqCst);
    }

    /// Requests an abort, returning `true` if the request was accepted.
    pub fn trigger(&self) -> bool {
        if self.armed.load(Ordering::SeqCst) {
            self.triggered.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Returns `true` if an abort was requested since the token was armed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.triggered.load(Ordering::Relaxed)
    }

    /// Returns `true` if the token accepts requests.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests_of_interrupt {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_armed());
        // Ignored while disarmed
        assert!(!interrupt.trigger());
        assert!(!interrupt.is_set());
        interrupt.arm();
        let handler = interrupt.clone();
        assert!(handler.trigger());
        assert!(interrupt.is_set());
        // Re-arming clears the pending request
        interrupt.arm();
        assert!(!interrupt.is_set());
        handler.trigger();
        interrupt.disarm();
        assert!(!interrupt.is_set());
        assert!(!interrupt.is_armed());
    }

    #[test]
    fn test_trigger_from_thread() {
        let interrupt = Interrupt::new();
        interrupt.arm();
        let handler = interrupt.clone();
        std::thread::spawn(move || handler.trigger())
            .join()
            .unwrap();
        assert!(interrupt.is_set());
    }
}
