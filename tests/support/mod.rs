// ABOUTME: Test support utilities.
// ABOUTME: Provides a scripted fake docker binary and a recording ContainerOps double.

use async_trait::async_trait;
use dockwright::command::{ContainerSummary, RunCommand};
use dockwright::error::{Error, Result};
use dockwright::process::ProcessRunner;
use dockwright::session::{ContainerFilters, ContainerOps};
use dockwright::types::ContainerId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("dockwright=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Write an executable shell script.
#[allow(dead_code)]
pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

const FAKE_DOCKER: &str = r#"#!/bin/sh
state="$FAKE_DOCKER_DIR"
echo "$*" >> "$state/calls.log"
case "$1" in
  version)
    if [ -f "$state/version.txt" ]; then cat "$state/version.txt"; else
      printf 'Client: Docker Engine - Community\n Version: 26.1.0\n\nServer: Docker Engine - Community\n Engine:\n  Version: 26.1.1\n'
    fi
    ;;
  info)
    echo " Operating System: Debian GNU/Linux 12 (bookworm)"
    ;;
  context)
    echo "unix:///var/run/docker.sock"
    ;;
  ps)
    if [ -f "$state/ps.txt" ]; then cat "$state/ps.txt"; fi
    ;;
  run)
    echo "Unable to find image 'alpine:latest' locally"
    echo "c0ffee0000000000000000000000000000000000000000000000000000000001"
    ;;
  stop|rm)
    for arg in "$@"; do
      if grep -qx "$arg" "$state/missing.txt" 2>/dev/null; then
        echo "Error response from daemon: No such container: $arg" >&2
        exit 1
      fi
    done
    ;;
  inspect)
    echo true
    ;;
  *)
    echo "unknown command: $1" >&2
    exit 125
    ;;
esac
"#;

/// A shell script standing in for the docker binary.
///
/// Every invocation is appended to `calls.log`; `ps` prints whatever
/// [`FakeDocker::set_ps_output`] stored.
#[allow(dead_code)]
pub struct FakeDocker {
    dir: TempDir,
}

#[allow(dead_code)]
impl FakeDocker {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_script(&dir.path().join("docker"), FAKE_DOCKER);
        Self { dir }
    }

    pub fn program(&self) -> PathBuf {
        self.dir.path().join("docker")
    }

    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.program().to_string_lossy())
            .env("FAKE_DOCKER_DIR", self.dir.path().to_string_lossy())
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn set_ps_output(&self, text: &str) {
        fs::write(self.dir.path().join("ps.txt"), text).unwrap();
    }

    pub fn set_version(&self, text: &str) {
        fs::write(self.dir.path().join("version.txt"), text).unwrap();
    }

    /// Make `stop` and `rm` of `id` fail with "No such container".
    pub fn mark_missing(&self, id: &str) {
        let path = self.dir.path().join("missing.txt");
        let mut content = fs::read_to_string(&path).unwrap_or_default();
        content.push_str(id);
        content.push('\n');
        fs::write(path, content).unwrap();
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

/// In-memory [`ContainerOps`] that records every call.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingOps {
    calls: Mutex<Vec<String>>,
    listed: Mutex<Vec<ContainerSummary>>,
    failing: Mutex<HashSet<String>>,
    next_id: Mutex<u32>,
}

#[allow(dead_code)]
impl RecordingOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn set_listed(&self, containers: Vec<ContainerSummary>) {
        *self.listed.lock() = containers;
    }

    /// Make `stop` and `rm` of `id` fail with a non-retryable error.
    pub fn fail_on(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    fn check(&self, id: &ContainerId, verb: &str) -> Result<()> {
        if self.failing.lock().contains(id.as_str()) {
            return Err(Error::CommandFailed {
                command: format!("docker {verb} {id}"),
                exit_code: 1,
                stdout: String::new(),
                stderr: "Error response from daemon: conflict".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for RecordingOps {
    async fn run_container(&self, command: &RunCommand) -> Result<ContainerId> {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("c{:03}", *next)
        };
        let labels: Vec<String> = command
            .label_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        self.calls
            .lock()
            .push(format!("run {id} {}", labels.join(",")));
        Ok(ContainerId::new(id))
    }

    async fn stop_container(&self, id: &ContainerId, grace: Duration) -> Result<()> {
        self.stop_container_blocking(id, grace)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<()> {
        self.remove_container_blocking(id, force)
    }

    async fn list_containers(&self, _filters: &ContainerFilters) -> Result<Vec<ContainerSummary>> {
        self.calls.lock().push("ps".to_string());
        Ok(self.listed.lock().clone())
    }

    async fn container_running(&self, id: &ContainerId) -> Result<bool> {
        self.calls.lock().push(format!("inspect {id}"));
        Ok(!self.failing.lock().contains(id.as_str()))
    }

    fn stop_container_blocking(&self, id: &ContainerId, grace: Duration) -> Result<()> {
        self.calls
            .lock()
            .push(format!("stop {id} {}s", grace.as_secs()));
        self.check(id, "stop")
    }

    fn remove_container_blocking(&self, id: &ContainerId, force: bool) -> Result<()> {
        let flag = if force { " --force" } else { "" };
        self.calls.lock().push(format!("rm{flag} {id}"));
        self.check(id, "rm")
    }
}

/// A listed container carrying the given labels.
#[allow(dead_code)]
pub fn summary(id: &str, labels: &[(&str, &str)]) -> ContainerSummary {
    ContainerSummary {
        id: id.to_string(),
        image: "alpine:3.20".to_string(),
        state: "running".to_string(),
        status: "Up 3 minutes".to_string(),
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Default::default()
    }
}
