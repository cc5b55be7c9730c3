// ABOUTME: Bounded retry of fallible docker operations with pluggable backoff.
// ABOUTME: The policy decides which failure kinds are worth another attempt.

mod backoff;
mod policy;

pub use backoff::Backoff;
pub use policy::{RetryPolicy, retry, retry_blocking};
