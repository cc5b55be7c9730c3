// ABOUTME: Delay strategies between retry attempts.
// ABOUTME: Fixed, linear, and capped exponential, keyed by 1-based attempt number.

use std::time::Duration;

/// Maps a 1-based attempt number to the delay before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed(Duration),
    /// `initial + increment * (n - 1)`.
    Linear { initial: Duration, increment: Duration },
    /// `initial * multiplier^(n - 1)`, never more than `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl Backoff {
    pub const fn fixed(delay: Duration) -> Self {
        Backoff::Fixed(delay)
    }

    pub const fn linear(initial: Duration, increment: Duration) -> Self {
        Backoff::Linear { initial, increment }
    }

    pub const fn exponential(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Backoff::Exponential {
            initial,
            multiplier,
            max,
        }
    }

    /// Delay after the given attempt failed. Attempt 0 is treated as 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let steps = attempt.max(1) - 1;
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear { initial, increment } => {
                initial.saturating_add(increment.saturating_mul(steps))
            }
            Backoff::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = i32::try_from(steps).unwrap_or(i32::MAX);
                let secs = initial.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs.max(0.0)).min(max)
                }
            }
        }
    }
}
