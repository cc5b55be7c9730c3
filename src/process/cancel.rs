// ABOUTME: Cooperative cancellation flag shared with a running child process.
// ABOUTME: The runner polls it and terminates the child once it trips.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag that asks an in-flight execution to kill its child.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns a guard that cancels this token when dropped.
    pub fn drop_guard(&self) -> CancelGuard {
        CancelGuard {
            token: self.clone(),
        }
    }
}

/// Cancels its token on drop, so an abandoned await still reaches the child.
#[derive(Debug)]
#[must_use = "dropping the guard cancels the token immediately"]
pub struct CancelGuard {
    token: CancelToken,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
