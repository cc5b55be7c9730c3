// ABOUTME: Readiness waiting: poll a strategy until it passes or a deadline expires.
// ABOUTME: Port and HTTP strategies open real connections rather than checking process state.

mod probe;

pub use probe::ProbeError;

use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::session::ContainerOps;
use crate::types::ContainerId;

/// What "ready" means for a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// The container reports itself as running.
    Running(ContainerId),
    /// A TCP connection to `host:port` succeeds.
    Port { host: String, port: u16 },
    /// `GET path` on `host:port` answers with `expected_status`.
    Http {
        host: String,
        port: u16,
        path: String,
        expected_status: u16,
    },
}

impl WaitStrategy {
    pub fn port(host: impl Into<String>, port: u16) -> Self {
        WaitStrategy::Port {
            host: host.into(),
            port,
        }
    }

    /// HTTP probe expecting `200 OK`.
    pub fn http(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        WaitStrategy::Http {
            host: host.into(),
            port,
            path: path.into(),
            expected_status: 200,
        }
    }

    /// Run the probe once.
    pub async fn probe<R>(&self, ops: &R) -> std::result::Result<(), ProbeError>
    where
        R: ContainerOps + ?Sized,
    {
        match self {
            WaitStrategy::Running(id) => probe::running(ops, id).await,
            WaitStrategy::Port { host, port } => probe::port(host, *port).await,
            WaitStrategy::Http {
                host,
                port,
                path,
                expected_status,
            } => probe::http(host, *port, path, *expected_status).await,
        }
    }
}

/// Probe every `interval` until `strategy` passes.
///
/// Fails with [`Error::Timeout`] once `timeout` has elapsed, or with the
/// underlying error right away if the container no longer exists.
pub async fn wait_until_ready<R>(
    ops: &R,
    strategy: &WaitStrategy,
    timeout: Duration,
    interval: Duration,
) -> Result<()>
where
    R: ContainerOps + ?Sized,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());

        match tokio::time::timeout(remaining, strategy.probe(ops)).await {
            Ok(Ok(())) => {
                tracing::debug!(attempt, elapsed = ?started.elapsed(), "ready");
                return Ok(());
            }
            Ok(Err(ProbeError::State { source, .. }))
                if source.kind() == crate::error::ErrorKind::NotFound =>
            {
                return Err(source);
            }
            Ok(Err(e)) => tracing::debug!(attempt, "not ready: {}", e),
            Err(_) => tracing::debug!(attempt, "probe did not finish before the deadline"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout(started.elapsed()));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
