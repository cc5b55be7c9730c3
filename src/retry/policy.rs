// ABOUTME: Retry policy value and the loops that apply it to sync and async operations.
// ABOUTME: Attempts are bounded, and non-retryable failures surface on the first try.

use std::future::Future;
use std::time::Duration;

use super::Backoff;
use crate::error::{Error, Result};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BACKOFF: Backoff =
    Backoff::exponential(Duration::from_millis(100), 2.0, Duration::from_secs(10));

/// How many times to try, how long to wait in between, and what is worth retrying.
///
/// `max_attempts` is at least 1; the only way to build a policy with 0 is
/// rejected by [`RetryPolicy::new`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    retryable: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            retryable: Error::is_transient,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, for callers that want one code path with or without retries.
    pub const NO_RETRY: RetryPolicy = RetryPolicy {
        max_attempts: 1,
        backoff: Backoff::Fixed(Duration::ZERO),
        retryable: Error::is_transient,
    };

    pub fn new(max_attempts: u32, backoff: Backoff) -> Result<Self> {
        if max_attempts < 1 {
            return Err(Error::InvalidConfig(
                "retry policy needs at least one attempt".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            backoff,
            retryable: Error::is_transient,
        })
    }

    /// Replace the predicate that selects retryable failures.
    pub fn with_retryable(mut self, retryable: fn(&Error) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn is_retryable(&self, error: &Error) -> bool {
        (self.retryable)(error)
    }

    /// Delay to wait after `attempt` failed, or `None` if no attempt follows.
    fn next_delay(&self, attempt: u32, error: &Error) -> Option<Duration> {
        (attempt < self.max_attempts && self.is_retryable(error))
            .then(|| self.backoff.delay(attempt))
    }
}

/// Run `operation` until it succeeds, fails non-retryably, or runs out of attempts.
///
/// The closure receives the 1-based attempt number. The last failure is
/// returned unchanged.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let Some(delay) = policy.next_delay(attempt, &error) else {
            return Err(error);
        };
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            ?delay,
            "retrying after failure: {}",
            error
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Blocking counterpart of [`retry`], sleeping the calling thread between attempts.
pub fn retry_blocking<T, F>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let mut attempt = 1;
    loop {
        let error = match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let Some(delay) = policy.next_delay(attempt, &error) else {
            return Err(error);
        };
        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            ?delay,
            "retrying after failure: {}",
            error
        );
        std::thread::sleep(delay);
        attempt += 1;
    }
}
