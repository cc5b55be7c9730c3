// ABOUTME: Configuration file for lifecycle tracking and retry behaviour.
// ABOUTME: Loaded from dockwright.yml, with every field optional and defaulted.

mod lifecycle;
mod retry;

pub use lifecycle::{LifecycleConfig, MAX_SHUTDOWN_STOP_TIMEOUT};
pub use retry::{BackoffConfig, RetryConfig};

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "dockwright.yml";
pub const CONFIG_FILENAME_ALT: &str = "dockwright.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dockwright/config.yml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is a valid, all-defaults config.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => Error::InvalidConfig(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Load the first config file found in `dir`, if any.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path).map(Some);
            }
        }

        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        self.lifecycle.validate()?;
        self.retry.to_policy()?;
        Ok(())
    }
}
