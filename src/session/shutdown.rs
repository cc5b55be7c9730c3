// ABOUTME: Process-exit and signal hooks that run the registered registries' shutdown sweeps.
// ABOUTME: One exit function and at most one signal listener, however many registries register.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::SessionRegistry;

static REGISTERED: Mutex<Vec<Arc<SessionRegistry>>> = parking_lot::const_mutex(Vec::new());

/// Whether a signal listener task is alive.
static LISTENING: AtomicBool = AtomicBool::new(false);

pub(super) fn register(registry: Arc<SessionRegistry>) {
    REGISTERED.lock().push(registry);
    spawn_signal_listener();
}

pub(super) fn unregister(registry: &SessionRegistry) {
    REGISTERED
        .lock()
        .retain(|r| !std::ptr::eq(Arc::as_ptr(r), registry));
}

fn take_registered() -> Vec<Arc<SessionRegistry>> {
    std::mem::take(&mut *REGISTERED.lock())
}

/// Run and clear every registered sweep. Later calls find nothing to do.
async fn run_registered() {
    for registry in take_registered() {
        let cleaned = registry.shutdown().await;
        tracing::debug!(session = %registry.session_id(), cleaned, "shutdown sweep finished");
    }
}

/// Runs after `main` returns or on `process::exit`.
///
/// Thread-local destructors have already run by now, so no tokio runtime
/// can be entered here and this thread's logging state is gone. The sweep
/// takes the blocking path with logging on this thread switched off.
#[ctor::dtor]
fn cleanup_on_exit() {
    let registries = take_registered();
    if registries.is_empty() {
        return;
    }
    tracing::dispatcher::with_default(&tracing::Dispatch::none(), || {
        for registry in registries {
            registry.shutdown_blocking();
        }
    });
}

/// Clears [`LISTENING`] when the listener task ends or its runtime goes away.
struct ListenerGuard;

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        LISTENING.store(false, Ordering::Release);
    }
}

fn spawn_signal_listener() {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    if LISTENING
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return;
    }
    handle.spawn(async {
        let _guard = ListenerGuard;
        if let Some(code) = wait_for_signal().await {
            run_registered().await;
            std::process::exit(code);
        }
    });
}

/// Exit code for the received signal, or `None` if listening failed.
#[cfg(unix)]
async fn wait_for_signal() -> Option<i32> {
    use nix::sys::signal::Signal;
    use tokio::signal::unix::{SignalKind, signal};

    let (mut term, mut int) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("failed to install signal handlers: {}", e);
            return None;
        }
    };

    let received = tokio::select! {
        _ = term.recv() => Signal::SIGTERM,
        _ = int.recv() => Signal::SIGINT,
    };
    tracing::info!(signal = ?received, "received signal, cleaning up");
    Some(128 + received as i32)
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Option<i32> {
    tokio::signal::ctrl_c().await.ok().map(|()| 130)
}
