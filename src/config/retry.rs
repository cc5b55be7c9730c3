// ABOUTME: Retry settings as written in the config file.
// ABOUTME: Converted into a validated RetryPolicy before use.

use serde::Deserialize;
use std::time::Duration;

use crate::error::Result;
use crate::retry::{Backoff, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryConfig {
    /// Build the policy, rejecting `max_attempts: 0`.
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(self.max_attempts, self.backoff.to_backoff())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackoffConfig {
    Fixed {
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
    Linear {
        #[serde(with = "humantime_serde")]
        initial: Duration,
        #[serde(with = "humantime_serde")]
        increment: Duration,
    },
    Exponential {
        #[serde(default = "default_initial", with = "humantime_serde")]
        initial: Duration,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        #[serde(default = "default_max", with = "humantime_serde")]
        max: Duration,
    },
}

fn default_initial() -> Duration {
    Duration::from_millis(100)
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max() -> Duration {
    Duration::from_secs(10)
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig::Exponential {
            initial: default_initial(),
            multiplier: default_multiplier(),
            max: default_max(),
        }
    }
}

impl BackoffConfig {
    pub fn to_backoff(&self) -> Backoff {
        match *self {
            BackoffConfig::Fixed { delay } => Backoff::fixed(delay),
            BackoffConfig::Linear { initial, increment } => Backoff::linear(initial, increment),
            BackoffConfig::Exponential {
                initial,
                multiplier,
                max,
            } => Backoff::exponential(initial, multiplier, max),
        }
    }
}
