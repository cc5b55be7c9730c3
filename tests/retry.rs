// ABOUTME: Integration tests for retry policies over async and blocking operations.
// ABOUTME: Uses paused tokio time to check backoff delays exactly.

use dockwright::error::{Error, Result};
use dockwright::retry::{Backoff, RetryPolicy, retry, retry_blocking};
use std::time::Duration;
use tokio::time::Instant;

const MS: Duration = Duration::from_millis(1);

fn command_failed() -> Error {
    Error::CommandFailed {
        command: "docker rm abc".to_string(),
        exit_code: 1,
        stdout: String::new(),
        stderr: "Error response from daemon: conflict".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn retryable_failure_runs_max_attempts_with_backoff() {
    let policy = RetryPolicy::new(4, Backoff::exponential(MS * 100, 2.0, MS * 250)).unwrap();
    let started = Instant::now();
    let mut stamps = Vec::new();

    let result: Result<()> = retry(&policy, |_| {
        stamps.push(started.elapsed());
        async { Err(Error::Timeout(Duration::from_secs(1))) }
    })
    .await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    // delays: 100ms, 200ms, then capped at 250ms
    assert_eq!(stamps, [MS * 0, MS * 100, MS * 300, MS * 550]);
}

#[tokio::test(start_paused = true)]
async fn default_policy_tries_three_times() {
    let started = Instant::now();
    let mut attempts = Vec::new();

    let result: Result<()> = retry(&RetryPolicy::default(), |attempt| {
        attempts.push((attempt, started.elapsed()));
        async { Err(Error::DaemonNotRunning("connection refused".into())) }
    })
    .await;

    assert!(matches!(result, Err(Error::DaemonNotRunning(_))));
    assert_eq!(attempts, [(1, MS * 0), (2, MS * 100), (3, MS * 300)]);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_failure_runs_once() {
    let policy = RetryPolicy::new(5, Backoff::fixed(MS * 10)).unwrap();
    let mut calls = 0;

    let result: Result<()> = retry(&policy, |_| {
        calls += 1;
        async { Err(command_failed()) }
    })
    .await;

    assert_eq!(calls, 1);
    let err = result.unwrap_err();
    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(err.stderr(), Some("Error response from daemon: conflict"));
}

#[tokio::test(start_paused = true)]
async fn succeeds_once_the_failure_clears() {
    let policy = RetryPolicy::new(5, Backoff::linear(MS * 50, MS * 50)).unwrap();

    let value = retry(&policy, |attempt| async move {
        if attempt < 3 {
            Err(Error::Timeout(MS))
        } else {
            Ok(attempt * 10)
        }
    })
    .await
    .unwrap();

    assert_eq!(value, 30);
}

#[tokio::test(start_paused = true)]
async fn no_retry_policy_runs_once_even_for_transient_failures() {
    let mut calls = 0;
    let result: Result<()> = retry(&RetryPolicy::NO_RETRY, |_| {
        calls += 1;
        async { Err(Error::Timeout(MS)) }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls, 1);
}

#[tokio::test(start_paused = true)]
async fn custom_predicate_selects_retryable_failures() {
    let policy = RetryPolicy::new(3, Backoff::fixed(MS))
        .unwrap()
        .with_retryable(|e| matches!(e, Error::NotFound(_)));

    let mut calls = 0;
    let _: Result<()> = retry(&policy, |_| {
        calls += 1;
        async { Err(Error::NotFound("abc".into())) }
    })
    .await;
    assert_eq!(calls, 3);

    let mut calls = 0;
    let _: Result<()> = retry(&policy, |_| {
        calls += 1;
        async { Err(Error::Timeout(MS)) }
    })
    .await;
    assert_eq!(calls, 1);
}

#[test]
fn blocking_retry_matches_async_semantics() {
    let policy = RetryPolicy::new(3, Backoff::fixed(MS)).unwrap();

    let mut calls = 0;
    let result: Result<()> = retry_blocking(&policy, |_| {
        calls += 1;
        Err(Error::Timeout(MS))
    });
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(calls, 3);

    let mut calls = 0;
    let result: Result<()> = retry_blocking(&policy, |_| {
        calls += 1;
        Err(command_failed())
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
}

#[test]
fn zero_attempts_is_rejected_at_construction() {
    let err = RetryPolicy::new(0, Backoff::fixed(MS)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
