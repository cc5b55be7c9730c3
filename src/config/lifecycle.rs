// ABOUTME: Lifecycle registry settings: shutdown hook, cleanup on exit, stop grace periods.
// ABOUTME: The exit-time grace period is hard-capped so a shutdown sweep stays bounded.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bound for [`LifecycleConfig::shutdown_stop_timeout`].
pub const MAX_SHUTDOWN_STOP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Register the registry for cleanup at process exit and on SIGINT/SIGTERM.
    #[serde(default)]
    pub install_shutdown_hook: bool,

    /// Whether the shutdown hook actually sweeps tracked containers.
    #[serde(default = "default_cleanup_on_shutdown")]
    pub cleanup_on_shutdown: bool,

    /// Grace period for stop-before-remove during explicit cleanup.
    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    /// Grace period used inside the shutdown hook.
    #[serde(default = "default_shutdown_stop_timeout", with = "humantime_serde")]
    pub shutdown_stop_timeout: Duration,
}

fn default_cleanup_on_shutdown() -> bool {
    true
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_shutdown_stop_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig {
            install_shutdown_hook: false,
            cleanup_on_shutdown: default_cleanup_on_shutdown(),
            stop_timeout: default_stop_timeout(),
            shutdown_stop_timeout: default_shutdown_stop_timeout(),
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shutdown_stop_timeout > MAX_SHUTDOWN_STOP_TIMEOUT {
            return Err(Error::InvalidConfig(format!(
                "shutdown_stop_timeout of {:?} exceeds the {:?} limit",
                self.shutdown_stop_timeout, MAX_SHUTDOWN_STOP_TIMEOUT
            )));
        }
        Ok(())
    }
}
