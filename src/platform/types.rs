// ABOUTME: Runtime kind enumeration and the cached platform descriptor.
// ABOUTME: Includes the per-runtime feature table behind Unsupported failures.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::process::ProcessRunner;

/// The container runtime answering the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeKind {
    Docker,
    DockerDesktop,
    Podman,
    Colima,
    OrbStack,
    RancherDesktop,
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::DockerDesktop => "docker-desktop",
            RuntimeKind::Podman => "podman",
            RuntimeKind::Colima => "colima",
            RuntimeKind::OrbStack => "orbstack",
            RuntimeKind::RancherDesktop => "rancher-desktop",
        };
        f.write_str(name)
    }
}

/// CLI features that not every runtime provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// `docker swarm` / `docker service`.
    Swarm,
    /// `docker buildx bake`.
    BuildxBake,
    /// `docker checkpoint`.
    Checkpoint,
}

impl Feature {
    fn command(&self) -> &'static str {
        match self {
            Feature::Swarm => "swarm",
            Feature::BuildxBake => "buildx bake",
            Feature::Checkpoint => "checkpoint",
        }
    }
}

/// Detected runtime information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    /// The runtime behind the CLI.
    pub kind: RuntimeKind,
    /// Server version when the daemon answered, client version otherwise.
    pub version: Option<String>,
    /// Connection endpoint, e.g. `unix:///var/run/docker.sock`.
    pub endpoint: Option<String>,
}

impl PlatformInfo {
    pub fn supports(&self, feature: Feature) -> bool {
        match (self.kind, feature) {
            (RuntimeKind::Podman, Feature::Swarm | Feature::BuildxBake) => false,
            (RuntimeKind::Podman, Feature::Checkpoint) => true,
            (_, Feature::Checkpoint) => self.kind == RuntimeKind::Docker,
            _ => true,
        }
    }

    pub fn ensure_supports(&self, feature: Feature) -> Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(Error::Unsupported {
                command: feature.command().to_string(),
                runtime: self.kind,
            })
        }
    }

    /// Point a runner at the detected endpoint.
    pub fn configure_runner(&self, runner: ProcessRunner) -> ProcessRunner {
        match self.endpoint {
            Some(ref endpoint) => runner.env("DOCKER_HOST", endpoint.clone()),
            None => runner,
        }
    }
}
