// ABOUTME: Runtime detection from `version`/`info` output, endpoint, and well-known sockets.
// ABOUTME: Probes once, caches the descriptor for the life of the detector.

use std::io;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use super::types::{PlatformInfo, RuntimeKind};
use crate::command::{DockerCommand, ExitPolicy, RawCommand, classify_failure};
use crate::error::{Error, Result};
use crate::process::{ExecResult, ProcessRunner};

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detects the local runtime once and hands out the cached answer afterwards.
#[derive(Debug)]
pub struct PlatformDetector {
    runner: ProcessRunner,
    cached: OnceLock<PlatformInfo>,
}

impl PlatformDetector {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            runner,
            cached: OnceLock::new(),
        }
    }

    /// The cached descriptor, if detection already succeeded.
    pub fn cached(&self) -> Option<&PlatformInfo> {
        self.cached.get()
    }

    /// Detect without blocking the async scheduler.
    ///
    /// Failures are not cached; the next call probes again.
    pub async fn detect(&self) -> Result<PlatformInfo> {
        if let Some(info) = self.cached.get() {
            return Ok(info.clone());
        }
        let runner = self.runner.clone();
        let info = tokio::task::spawn_blocking(move || probe(&runner))
            .await
            .map_err(|e| Error::Io(io::Error::other(format!("detection task failed: {e}"))))??;
        Ok(self.cached.get_or_init(|| info).clone())
    }

    /// Detect on the calling thread.
    pub fn detect_blocking(&self) -> Result<PlatformInfo> {
        if let Some(info) = self.cached.get() {
            return Ok(info.clone());
        }
        let info = probe(&self.runner)?;
        Ok(self.cached.get_or_init(|| info).clone())
    }
}

fn probe(runner: &ProcessRunner) -> Result<PlatformInfo> {
    let version = run_probe(runner, &["version"])?;
    if !version.success() {
        // `version` prints the client half even when the daemon is down,
        // but a descriptor without a server is not worth caching.
        return Err(classify_failure(
            format!("{} version", runner.program()),
            version,
        ));
    }

    let info = match run_probe(runner, &["info"]) {
        Ok(result) if result.success() => result.stdout,
        Ok(result) => {
            tracing::debug!(exit_code = result.exit_code, "info probe failed, classifying without it");
            String::new()
        }
        Err(e) => {
            tracing::debug!("info probe failed, classifying without it: {}", e);
            String::new()
        }
    };

    let endpoint = resolve_endpoint(runner);
    let kind = classify(&version.stdout, &info, endpoint.as_deref());
    let version = parse_server_version(&version.stdout);

    tracing::debug!(%kind, ?version, ?endpoint, "detected container runtime");

    Ok(PlatformInfo {
        kind,
        version,
        endpoint,
    })
}

fn run_probe(runner: &ProcessRunner, args: &[&str]) -> Result<ExecResult> {
    let tokens = args.iter().map(|a| a.to_string()).collect();
    let command = RawCommand::from_vec(tokens, ExitPolicy::ReturnExitCode)
        .ok_or_else(|| Error::InvalidConfig("empty probe command".to_string()))?
        .with_timeout(PROBE_TIMEOUT);
    command.execute_blocking(runner)
}

/// Classify the runtime from `version` and `info` text plus the endpoint.
pub fn classify(version: &str, info: &str, endpoint: Option<&str>) -> RuntimeKind {
    let version = version.to_lowercase();
    let info = info.to_lowercase();
    let endpoint = endpoint.unwrap_or_default().to_lowercase();

    if version.contains("podman") || info.contains("podman") || endpoint.contains("podman") {
        RuntimeKind::Podman
    } else if endpoint.contains("/.colima/") || info.contains("name: colima") {
        RuntimeKind::Colima
    } else if endpoint.contains("/.orbstack/") || info.contains("orbstack") {
        RuntimeKind::OrbStack
    } else if endpoint.contains("/.rd/") || info.contains("rancher desktop") {
        RuntimeKind::RancherDesktop
    } else if info.contains("docker desktop") || version.contains("docker desktop") {
        RuntimeKind::DockerDesktop
    } else {
        RuntimeKind::Docker
    }
}

/// Server version from `version` output, falling back to the client version.
pub fn parse_server_version(text: &str) -> Option<String> {
    let mut in_server = false;
    let mut client = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Server") {
            in_server = true;
            continue;
        }
        if trimmed.starts_with("Client") {
            in_server = false;
            continue;
        }
        let Some(value) = trimmed.strip_prefix("Version:") else {
            continue;
        };
        let value = value.trim().to_string();
        if in_server {
            return Some(value);
        }
        if client.is_none() {
            client = Some(value);
        }
    }

    client
}

/// Endpoint order: explicit `DOCKER_HOST`, the active context, then well-known sockets.
fn resolve_endpoint(runner: &ProcessRunner) -> Option<String> {
    let configured = runner
        .envs()
        .iter()
        .find(|(k, _)| k == "DOCKER_HOST")
        .map(|(_, v)| v.clone())
        .or_else(|| std::env::var("DOCKER_HOST").ok())
        .filter(|v| !v.is_empty());
    if configured.is_some() {
        return configured;
    }

    let context = run_probe(
        runner,
        &["context", "inspect", "--format", "{{.Endpoints.docker.Host}}"],
    );
    if let Ok(result) = context {
        let host = result.stdout.trim();
        if result.success() && !host.is_empty() {
            return Some(host.to_string());
        }
    }

    socket_candidates()
        .into_iter()
        .find(|path| Path::new(path).exists())
        .map(|path| format!("unix://{path}"))
}

fn socket_candidates() -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(uid) = get_uid() {
        candidates.push(format!("/run/user/{uid}/podman/podman.sock"));
    }
    candidates.push(ROOTFUL_PODMAN.to_string());
    if let Ok(home) = std::env::var("HOME") {
        candidates.push(format!("{home}/.colima/default/docker.sock"));
        candidates.push(format!("{home}/.orbstack/run/docker.sock"));
        candidates.push(format!("{home}/.rd/docker.sock"));
    }
    candidates.push(DOCKER_SOCKET.to_string());
    candidates
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCKER_VERSION: &str = "\
Client: Docker Engine - Community
 Version:           24.0.7
 API version:       1.43
 OS/Arch:           linux/amd64

Server: Docker Engine - Community
 Engine:
  Version:          24.0.6
  API version:      1.43 (minimum version 1.12)
";

    const PODMAN_VERSION: &str = "\
Client:       Podman Engine
Version:      4.9.3
API Version:  4.9.3
Go Version:   go1.22.2
";

    #[test]
    fn server_version_preferred() {
        assert_eq!(parse_server_version(DOCKER_VERSION).as_deref(), Some("24.0.6"));
    }

    #[test]
    fn client_version_when_no_server_section() {
        assert_eq!(parse_server_version(PODMAN_VERSION).as_deref(), Some("4.9.3"));
        assert_eq!(parse_server_version("garbage"), None);
    }

    #[test]
    fn classifies_podman_from_version_text() {
        assert_eq!(classify(PODMAN_VERSION, "", None), RuntimeKind::Podman);
    }

    #[test]
    fn classifies_by_endpoint_socket() {
        assert_eq!(
            classify(DOCKER_VERSION, "", Some("unix:///Users/u/.colima/default/docker.sock")),
            RuntimeKind::Colima
        );
        assert_eq!(
            classify(DOCKER_VERSION, "", Some("unix:///Users/u/.orbstack/run/docker.sock")),
            RuntimeKind::OrbStack
        );
        assert_eq!(
            classify(DOCKER_VERSION, "", Some("unix:///Users/u/.rd/docker.sock")),
            RuntimeKind::RancherDesktop
        );
        assert_eq!(
            classify(DOCKER_VERSION, "", Some("unix:///run/user/1000/podman/podman.sock")),
            RuntimeKind::Podman
        );
    }

    #[test]
    fn classifies_by_info_text() {
        assert_eq!(
            classify(DOCKER_VERSION, " Operating System: Docker Desktop\n", None),
            RuntimeKind::DockerDesktop
        );
        assert_eq!(
            classify(DOCKER_VERSION, " Name: colima\n", None),
            RuntimeKind::Colima
        );
    }

    #[test]
    fn plain_engine_is_docker() {
        assert_eq!(
            classify(DOCKER_VERSION, " Operating System: Ubuntu 22.04.3 LTS\n", Some("unix:///var/run/docker.sock")),
            RuntimeKind::Docker
        );
    }

    #[test]
    fn docker_socket_is_last_candidate() {
        let candidates = socket_candidates();
        assert_eq!(candidates.last().map(String::as_str), Some(DOCKER_SOCKET));
        assert!(candidates.iter().any(|c| c == ROOTFUL_PODMAN));
    }
}
