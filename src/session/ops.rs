// ABOUTME: Container operations the registry depends on, and the CLI-backed implementation.
// ABOUTME: DockerCli runs each operation through the process runner under a retry policy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::labels::MANAGED_LABEL;
use crate::command::{
    ContainerSummary, DockerCommand, InspectRunningCommand, PsCommand, RemoveCommand, RunCommand,
    StopCommand,
};
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::retry::{RetryPolicy, retry, retry_blocking};
use crate::types::ContainerId;

/// Container lifecycle operations used by the registry and readiness probes.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Create and start a container, returning its ID.
    async fn run_container(&self, command: &RunCommand) -> Result<ContainerId>;

    /// Stop a container, waiting up to `grace` before it is killed.
    async fn stop_container(&self, id: &ContainerId, grace: Duration) -> Result<()>;

    /// Remove a container.
    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()>;

    /// List containers matching the given filters.
    async fn list_containers(&self, filters: &ContainerFilters) -> Result<Vec<ContainerSummary>>;

    /// Whether the container is currently running.
    async fn container_running(&self, id: &ContainerId) -> Result<bool>;

    /// [`stop_container`](Self::stop_container) without an async runtime.
    ///
    /// The process-exit sweep runs after the runtime and its thread-locals
    /// are gone, so it can only use these blocking forms.
    fn stop_container_blocking(&self, id: &ContainerId, grace: Duration) -> Result<()>;

    /// [`remove_container`](Self::remove_container) without an async runtime.
    fn remove_container_blocking(&self, id: &ContainerId, force: bool) -> Result<()>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by label (key=value).
    pub labels: HashMap<String, String>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Every managed container, running or not, from any session.
    pub fn managed() -> Self {
        let mut labels = HashMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        Self { labels, all: true }
    }

    fn to_command(&self) -> PsCommand {
        let mut labels: Vec<_> = self.labels.iter().collect();
        labels.sort();
        labels
            .into_iter()
            .fold(PsCommand::new().all(self.all), |cmd, (k, v)| {
                cmd.label_filter(k, v)
            })
    }
}

/// [`ContainerOps`] over the docker (or compatible) CLI.
#[derive(Debug, Clone, Default)]
pub struct DockerCli {
    runner: ProcessRunner,
    retry: RetryPolicy,
}

impl DockerCli {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            runner,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    async fn execute<C: DockerCommand>(&self, command: &C) -> Result<C::Output> {
        let runner = &self.runner;
        retry(&self.retry, move |_| command.execute(runner)).await
    }

    fn execute_blocking<C: DockerCommand>(&self, command: &C) -> Result<C::Output> {
        retry_blocking(&self.retry, |_| command.execute_blocking(&self.runner))
    }
}

#[async_trait]
impl ContainerOps for DockerCli {
    async fn run_container(&self, command: &RunCommand) -> Result<ContainerId> {
        // Not retried: a timed-out run may still have created the container.
        command.execute(&self.runner).await
    }

    async fn stop_container(&self, id: &ContainerId, grace: Duration) -> Result<()> {
        self.execute(&StopCommand::new(id.clone()).grace(grace)).await
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.execute(&RemoveCommand::new(id.clone()).force(force).volumes(true))
            .await
    }

    async fn list_containers(&self, filters: &ContainerFilters) -> Result<Vec<ContainerSummary>> {
        self.execute(&filters.to_command()).await
    }

    async fn container_running(&self, id: &ContainerId) -> Result<bool> {
        self.execute(&InspectRunningCommand::new(id.clone())).await
    }

    fn stop_container_blocking(&self, id: &ContainerId, grace: Duration) -> Result<()> {
        self.execute_blocking(&StopCommand::new(id.clone()).grace(grace))
    }

    fn remove_container_blocking(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.execute_blocking(&RemoveCommand::new(id.clone()).force(force).volumes(true))
    }
}
