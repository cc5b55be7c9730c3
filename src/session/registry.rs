// ABOUTME: Session-scoped registry of containers this process created, with cleanup sweeps.
// ABOUTME: Tracks by ID, recovers orphans by label, and tears down best-effort, continuing on error.

use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use super::labels::{ManagedLabels, ManagedResource, is_orphan};
use super::ops::{ContainerFilters, ContainerOps};
use super::{SessionId, shutdown};
use crate::command::{ContainerSummary, RunCommand};
use crate::config::LifecycleConfig;
use crate::error::{ErrorKind, Result};
use crate::types::ContainerId;

/// Wall-clock bound for the whole exit-time sweep.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// Containers created by this process, keyed by ID.
///
/// Construct one per process (or per test) and share it as an `Arc`. All
/// methods take `&self`; the tracked set is internally synchronized.
pub struct SessionRegistry {
    session: SessionId,
    ops: Arc<dyn ContainerOps>,
    config: RwLock<LifecycleConfig>,
    tracked: Mutex<HashMap<ContainerId, ManagedResource>>,
    hook_installed: AtomicBool,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("session", &self.session)
            .field("tracked", &self.tracked_count())
            .field("hook_installed", &self.shutdown_hook_installed())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// A registry for this process's session.
    ///
    /// Every registry built this way shares [`SessionId::current`], so none
    /// treats another's containers as orphans.
    pub fn new(ops: Arc<dyn ContainerOps>) -> Self {
        Self::with_session(ops, SessionId::current().clone())
    }

    pub fn with_session(ops: Arc<dyn ContainerOps>, session: SessionId) -> Self {
        Self {
            session,
            ops,
            config: RwLock::new(LifecycleConfig::default()),
            tracked: Mutex::new(HashMap::new()),
            hook_installed: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn config(&self) -> LifecycleConfig {
        self.config.read().clone()
    }

    /// Labels to stamp on a container created now.
    pub fn labels(&self) -> ManagedLabels {
        ManagedLabels::new(self.session.clone(), Utc::now())
    }

    /// Create a container stamped with this session's labels and track it.
    pub async fn provision(&self, command: RunCommand) -> Result<ContainerId> {
        let labels = self.labels();
        let command = command.labels(labels.pairs());
        let id = self.ops.run_container(&command).await?;
        tracing::debug!(container = %id, session = %self.session, "provisioned container");
        self.track_resource(ManagedResource {
            id: id.clone(),
            session: labels.session,
            created_at: labels.created_at,
        });
        Ok(id)
    }

    /// Start tracking `id`. Tracking an already tracked ID is a no-op.
    pub fn track(&self, id: ContainerId) {
        let resource = ManagedResource {
            id,
            session: self.session.clone(),
            created_at: Utc::now(),
        };
        self.track_resource(resource);
    }

    pub fn track_resource(&self, resource: ManagedResource) {
        self.tracked.lock().entry(resource.id.clone()).or_insert(resource);
    }

    /// Stop tracking `id`, returning whether it was tracked.
    pub fn untrack(&self, id: &ContainerId) -> bool {
        self.tracked.lock().remove(id).is_some()
    }

    pub fn is_tracked(&self, id: &ContainerId) -> bool {
        self.tracked.lock().contains_key(id)
    }

    /// Snapshot of the tracked set, oldest first.
    pub fn tracked(&self) -> Vec<ManagedResource> {
        let mut resources: Vec<_> = self.tracked.lock().values().cloned().collect();
        resources.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        resources
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().len()
    }

    /// Managed containers that belong to some other session.
    pub async fn find_orphans(&self) -> Result<Vec<ContainerSummary>> {
        let containers = self.ops.list_containers(&ContainerFilters::managed()).await?;
        Ok(containers
            .into_iter()
            .filter(|c| is_orphan(c, &self.session))
            .collect())
    }

    /// Stop and remove every tracked container.
    ///
    /// Returns how many were cleaned; the rest stay tracked.
    pub async fn cleanup_all(&self, force: bool) -> usize {
        let grace = self.config.read().stop_timeout;
        self.cleanup_tracked(grace, force).await
    }

    /// Stop and remove managed containers left behind by other sessions.
    pub async fn cleanup_orphans(&self, force: bool) -> Result<usize> {
        let session = self.session.clone();
        self.cleanup(move |c| is_orphan(c, &session), force).await
    }

    /// Stop and remove the managed containers `predicate` selects.
    ///
    /// Listing failures are returned; per-container failures are logged.
    pub async fn cleanup<P>(&self, predicate: P, force: bool) -> Result<usize>
    where
        P: Fn(&ContainerSummary) -> bool,
    {
        let containers = self.ops.list_containers(&ContainerFilters::managed()).await?;
        let ids: Vec<ContainerId> = containers
            .iter()
            .filter(|c| predicate(c))
            .map(ContainerSummary::container_id)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        let grace = self.config.read().stop_timeout;
        tracing::info!(count = ids.len(), "cleaning up managed containers");
        let cleaned = self.sweep(ids, grace, force).await;
        for id in &cleaned {
            self.untrack(id);
        }
        Ok(cleaned.len())
    }

    /// Apply a new lifecycle configuration.
    ///
    /// Installs the shutdown hook when the config asks for it. Turning the
    /// flag off later does not uninstall a hook already in place.
    pub fn configure(self: &Arc<Self>, config: LifecycleConfig) -> Result<()> {
        config.validate()?;
        let install = config.install_shutdown_hook;
        *self.config.write() = config;
        if install {
            self.install_shutdown_hook();
        }
        Ok(())
    }

    /// Register this registry for cleanup at process exit.
    ///
    /// Returns `true` only for the call that actually installed it.
    pub fn install_shutdown_hook(self: &Arc<Self>) -> bool {
        if self
            .hook_installed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        shutdown::register(Arc::clone(self));
        tracing::debug!(session = %self.session, "installed shutdown hook");
        true
    }

    pub fn shutdown_hook_installed(&self) -> bool {
        self.hook_installed.load(Ordering::Acquire)
    }

    /// The exit-time sweep: force-remove everything tracked with the short grace period.
    ///
    /// Does nothing when `cleanup_on_shutdown` is off. Gives up after 30s.
    pub async fn shutdown(&self) -> usize {
        let config = self.config();
        if !config.cleanup_on_shutdown {
            return 0;
        }
        let sweep = self.cleanup_tracked(config.shutdown_stop_timeout, true);
        match tokio::time::timeout(SHUTDOWN_DEADLINE, sweep).await {
            Ok(cleaned) => cleaned,
            Err(_) => {
                tracing::warn!(
                    remaining = self.tracked_count(),
                    "shutdown cleanup did not finish within {:?}",
                    SHUTDOWN_DEADLINE
                );
                0
            }
        }
    }

    /// [`shutdown`](Self::shutdown) without an async runtime.
    ///
    /// Runs at process exit, after the runtime is gone. Each container is
    /// torn down on its own thread; any still in progress at the deadline
    /// are left behind and stay tracked.
    pub fn shutdown_blocking(&self) -> usize {
        let config = self.config();
        if !config.cleanup_on_shutdown {
            return 0;
        }
        let drained = self.drain_tracked();
        if drained.is_empty() {
            return 0;
        }

        let grace = config.shutdown_stop_timeout;
        let workers: Vec<_> = drained
            .iter()
            .map(|resource| {
                let ops = Arc::clone(&self.ops);
                let id = resource.id.clone();
                let worker = thread::spawn(move || teardown_blocking(ops.as_ref(), &id, grace));
                (resource.id.clone(), worker)
            })
            .collect();

        let deadline = Instant::now() + SHUTDOWN_DEADLINE;
        while Instant::now() < deadline && workers.iter().any(|(_, w)| !w.is_finished()) {
            thread::sleep(SHUTDOWN_POLL);
        }

        let mut cleaned = Vec::new();
        for (id, worker) in workers {
            if !worker.is_finished() {
                tracing::warn!(
                    container = %id,
                    "shutdown cleanup did not finish within {:?}",
                    SHUTDOWN_DEADLINE
                );
                continue;
            }
            match worker.join() {
                Ok(Ok(())) => cleaned.push(id),
                Ok(Err(e)) => {
                    tracing::warn!(container = %id, "failed to clean up container: {}", e)
                }
                Err(_) => tracing::warn!(container = %id, "cleanup thread panicked"),
            }
        }

        self.restore_uncleaned(drained, &cleaned);
        cleaned.len()
    }

    /// Forget all tracked containers and restore the default configuration.
    ///
    /// Also withdraws an installed shutdown hook, so the registry can be
    /// configured again from scratch.
    pub fn reset(&self) {
        self.tracked.lock().clear();
        *self.config.write() = LifecycleConfig::default();
        if self.hook_installed.swap(false, Ordering::AcqRel) {
            shutdown::unregister(self);
        }
    }

    async fn cleanup_tracked(&self, grace: Duration, force: bool) -> usize {
        let drained = self.drain_tracked();
        if drained.is_empty() {
            return 0;
        }

        tracing::info!(count = drained.len(), session = %self.session, "cleaning up tracked containers");
        let ids = drained.iter().map(|r| r.id.clone()).collect();
        let cleaned = self.sweep(ids, grace, force).await;
        self.restore_uncleaned(drained, &cleaned);
        cleaned.len()
    }

    /// Take the whole set up front so concurrent sweeps never double-stop.
    fn drain_tracked(&self) -> Vec<ManagedResource> {
        self.tracked.lock().drain().map(|(_, r)| r).collect()
    }

    fn restore_uncleaned(&self, drained: Vec<ManagedResource>, cleaned: &[ContainerId]) {
        let mut tracked = self.tracked.lock();
        for resource in drained.into_iter().filter(|r| !cleaned.contains(&r.id)) {
            tracked.entry(resource.id.clone()).or_insert(resource);
        }
    }

    /// Tear down every ID concurrently, returning the ones cleaned.
    async fn sweep(&self, ids: Vec<ContainerId>, grace: Duration, force: bool) -> Vec<ContainerId> {
        let outcomes = join_all(ids.into_iter().map(|id| async move {
            let outcome = self.teardown(&id, grace, force).await;
            (id, outcome)
        }))
        .await;

        let mut cleaned = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => cleaned.push(id),
                Err(e) => tracing::warn!(container = %id, "failed to clean up container: {}", e),
            }
        }
        cleaned
    }

    async fn teardown(&self, id: &ContainerId, grace: Duration, force: bool) -> Result<()> {
        if let Err(e) = self.ops.stop_container(id, grace).await {
            // Removal may still succeed, e.g. with force.
            tracing::debug!(container = %id, "stop failed, removing anyway: {}", e);
        }
        removed(id, self.ops.remove_container(id, force).await)
    }
}

/// Exit-time teardown: stop with `grace`, then force-remove.
fn teardown_blocking(ops: &dyn ContainerOps, id: &ContainerId, grace: Duration) -> Result<()> {
    if let Err(e) = ops.stop_container_blocking(id, grace) {
        tracing::debug!(container = %id, "stop failed, removing anyway: {}", e);
    }
    removed(id, ops.remove_container_blocking(id, true))
}

/// A container that is already gone counts as removed.
fn removed(id: &ContainerId, result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(container = %id, "already gone");
            Ok(())
        }
        other => other,
    }
}
