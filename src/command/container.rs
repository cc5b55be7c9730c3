// ABOUTME: Container lifecycle commands the registry and readiness probes drive.
// ABOUTME: run, stop, rm, inspect, wait, and exec, each with an explicit exit policy.

use std::time::Duration;

use super::classify::unexpected_output;
use super::{DockerCommand, ExitPolicy};
use crate::error::Result;
use crate::process::ExecResult;
use crate::types::ContainerId;

/// Extra wall-clock allowance on top of a stop grace period.
const STOP_OVERHEAD: Duration = Duration::from_secs(30);

/// `docker run --detach`: create and start a container, returning its ID.
///
/// Fails on non-zero exit.
#[derive(Debug, Clone)]
pub struct RunCommand {
    image: String,
    name: Option<String>,
    labels: Vec<(String, String)>,
    env: Vec<(String, String)>,
    ports: Vec<String>,
    command: Vec<String>,
    auto_remove: bool,
    raw_options: Vec<String>,
    raw: Vec<String>,
    timeout: Option<Duration>,
}

impl RunCommand {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
            labels: Vec::new(),
            env: Vec::new(),
            ports: Vec::new(),
            command: Vec::new(),
            auto_remove: false,
            raw_options: Vec::new(),
            raw: Vec::new(),
            timeout: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a label, replacing any earlier value for the same key.
    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.labels.retain(|(k, _)| *k != key);
        self.labels.push((key, value.into()));
        self
    }

    pub fn labels<I, K, V>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        labels
            .into_iter()
            .fold(self, |cmd, (k, v)| cmd.label(k, v))
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Publish a port, in any form `--publish` accepts (`8080:80`, `80`).
    pub fn publish(mut self, spec: impl Into<String>) -> Self {
        self.ports.push(spec.into());
        self
    }

    /// Command and arguments to run inside the container.
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = auto_remove;
        self
    }

    /// Raw flags placed before the image, for options not modelled here.
    pub fn raw_option(mut self, token: impl Into<String>) -> Self {
        self.raw_options.push(token.into());
        self
    }

    /// Raw tokens appended at the very end of the argument vector.
    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn label_pairs(&self) -> &[(String, String)] {
        &self.labels
    }
}

impl DockerCommand for RunCommand {
    type Output = ContainerId;

    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--detach".to_string()];
        if let Some(ref name) = self.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }
        if self.auto_remove {
            args.push("--rm".to_string());
        }
        for (k, v) in &self.labels {
            args.push("--label".to_string());
            args.push(format!("{k}={v}"));
        }
        for (k, v) in &self.env {
            args.push("--env".to_string());
            args.push(format!("{k}={v}"));
        }
        for port in &self.ports {
            args.push("--publish".to_string());
            args.push(port.clone());
        }
        args.extend(self.raw_options.iter().cloned());
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::FailOnNonZero
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn parse(&self, result: ExecResult) -> Result<ContainerId> {
        // Pull progress may precede the ID; the ID is always the last line.
        let id = result
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|l| !l.is_empty())
            .map(ContainerId::new);
        id.ok_or_else(|| unexpected_output(self.build_args().join(" "), result))
    }
}

/// `docker stop`: signal the container and wait up to a grace period.
///
/// Fails on non-zero exit.
#[derive(Debug, Clone)]
pub struct StopCommand {
    id: ContainerId,
    grace: Option<Duration>,
    raw: Vec<String>,
}

impl StopCommand {
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            grace: None,
            raw: Vec::new(),
        }
    }

    /// Seconds to wait before the daemon kills the container.
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = Some(grace);
        self
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }
}

impl DockerCommand for StopCommand {
    type Output = ();

    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["stop".to_string()];
        if let Some(grace) = self.grace {
            args.push("--time".to_string());
            args.push(grace.as_secs().to_string());
        }
        args.push(self.id.to_string());
        args
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::FailOnNonZero
    }

    fn timeout(&self) -> Option<Duration> {
        self.grace.map(|g| g + STOP_OVERHEAD)
    }

    fn parse(&self, _result: ExecResult) -> Result<()> {
        Ok(())
    }
}

/// `docker rm`: delete a container.
///
/// Fails on non-zero exit.
#[derive(Debug, Clone)]
pub struct RemoveCommand {
    id: ContainerId,
    force: bool,
    volumes: bool,
    raw: Vec<String>,
}

impl RemoveCommand {
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            force: false,
            volumes: false,
            raw: Vec::new(),
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Also remove anonymous volumes attached to the container.
    pub fn volumes(mut self, volumes: bool) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }
}

impl DockerCommand for RemoveCommand {
    type Output = ();

    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["rm".to_string()];
        if self.force {
            args.push("--force".to_string());
        }
        if self.volumes {
            args.push("--volumes".to_string());
        }
        args.push(self.id.to_string());
        args
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::FailOnNonZero
    }

    fn parse(&self, _result: ExecResult) -> Result<()> {
        Ok(())
    }
}

/// `docker inspect --format {{.State.Running}}`.
///
/// Fails on non-zero exit, so a missing container surfaces as `NotFound`.
#[derive(Debug, Clone)]
pub struct InspectRunningCommand {
    id: ContainerId,
    raw: Vec<String>,
}

impl InspectRunningCommand {
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            raw: Vec::new(),
        }
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }
}

impl DockerCommand for InspectRunningCommand {
    type Output = bool;

    fn build_args(&self) -> Vec<String> {
        vec![
            "inspect".to_string(),
            "--type".to_string(),
            "container".to_string(),
            "--format".to_string(),
            "{{.State.Running}}".to_string(),
            self.id.to_string(),
        ]
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::FailOnNonZero
    }

    fn parse(&self, result: ExecResult) -> Result<bool> {
        let running = match result.stdout.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        };
        running.ok_or_else(|| unexpected_output(self.build_args().join(" "), result))
    }
}

/// `docker wait`: block until the container stops and return its exit code.
///
/// The container's exit code is the command's value, never a failure. The
/// CLI itself failing (unknown container, daemon down) still fails.
#[derive(Debug, Clone)]
pub struct WaitCommand {
    id: ContainerId,
    timeout: Option<Duration>,
    raw: Vec<String>,
}

impl WaitCommand {
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            timeout: None,
            raw: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }
}

impl DockerCommand for WaitCommand {
    type Output = i64;

    fn build_args(&self) -> Vec<String> {
        vec!["wait".to_string(), self.id.to_string()]
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::FailOnNonZero
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn parse(&self, result: ExecResult) -> Result<i64> {
        let code = result
            .stdout
            .trim()
            .lines()
            .last()
            .and_then(|l| l.trim().parse().ok());
        code.ok_or_else(|| unexpected_output(self.build_args().join(" "), result))
    }
}

/// `docker exec`: run a process inside a running container.
///
/// Returns the raw result; a non-zero exit is the exec'd process's answer.
#[derive(Debug, Clone)]
pub struct ExecCommand {
    id: ContainerId,
    command: Vec<String>,
    env: Vec<(String, String)>,
    workdir: Option<String>,
    user: Option<String>,
    raw: Vec<String>,
    timeout: Option<Duration>,
}

impl ExecCommand {
    pub fn new<I, S>(id: ContainerId, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            command: command.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            workdir: None,
            user: None,
            raw: Vec::new(),
            timeout: None,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl DockerCommand for ExecCommand {
    type Output = ExecResult;

    fn build_args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        for (k, v) in &self.env {
            args.push("--env".to_string());
            args.push(format!("{k}={v}"));
        }
        if let Some(ref dir) = self.workdir {
            args.push("--workdir".to_string());
            args.push(dir.clone());
        }
        if let Some(ref user) = self.user {
            args.push("--user".to_string());
            args.push(user.clone());
        }
        args.push(self.id.to_string());
        args.extend(self.command.iter().cloned());
        args
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        ExitPolicy::ReturnExitCode
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn parse(&self, result: ExecResult) -> Result<ExecResult> {
        Ok(result)
    }
}
