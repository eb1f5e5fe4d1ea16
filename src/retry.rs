//! Retry with bounded exponential backoff and error classification.
//!
//! Only errors that look transient (timeouts, connection problems) are
//! retried; everything else fails fast so a permanent failure never burns
//! the whole retry budget. Classification is keyword-based on the error's
//! message chain, which is coarse but predictable.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng as _;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Errors produced by [`execute`] itself, as opposed to errors from the
/// wrapped operation (which pass through unmodified when not retryable).
#[derive(Debug, Error)]
pub enum RetryError {
    /// The caller's cancellation token fired during the operation or during
    /// a backoff sleep.
    #[error("operation canceled")]
    Canceled,

    /// Every attempt failed with a retryable error.
    #[error("retry failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
}

/// Backoff and classification settings for [`execute`].
///
/// Attempts are 1-indexed: `max_attempts = 3` means the operation runs at
/// most three times, with at most two backoff sleeps in between.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Add up to 50% random jitter to each backoff sleep.
    pub jitter: bool,
    pub is_retryable: fn(&anyhow::Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
            is_retryable: default_is_retryable,
        }
    }
}

impl RetryPolicy {
    /// Policy tuned for page navigation: slower start, same ceiling.
    pub fn navigation() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Backoff before attempt `attempt + 1`, where `attempt` is the
    /// 1-indexed attempt that just failed. Grows geometrically from
    /// `initial_delay`, capped at `max_delay`.
    fn backoff(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 1..attempt {
            delay = delay.mul_f64(self.multiplier);
            if delay >= self.max_delay {
                return self.max_delay;
            }
        }
        delay.min(self.max_delay)
    }
}

/// Default transient-vs-permanent classifier.
///
/// Checks the full error chain. Explicit cancellation and precondition
/// failures are never retried; well-known transient network wording is.
/// Unknown errors are treated as permanent so misclassified failures
/// surface immediately instead of stalling behind a retry loop.
pub fn default_is_retryable(err: &anyhow::Error) -> bool {
    let msg = format!("{err:#}").to_lowercase();

    let non_retryable = [
        "canceled",
        "cancelled",
        "deadline exceeded",
        "invalid argument",
        "not found",
        "forbidden",
        "unauthorized",
    ];
    for keyword in non_retryable {
        if msg.contains(keyword) {
            return false;
        }
    }

    let retryable = [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "no such host",
        "network",
        "temporary",
        "busy",
        "overloaded",
    ];
    for keyword in retryable {
        if msg.contains(keyword) {
            return true;
        }
    }

    false
}

/// Run `op`, retrying per `policy` until success, a non-retryable error,
/// exhaustion, or cancellation.
///
/// Non-retryable errors are returned unmodified with no backoff sleep.
/// `on_retry` is invoked with the 1-indexed attempt number and the error
/// before each backoff sleep. Cancellation during the operation or during
/// a sleep returns [`RetryError::Canceled`] promptly.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut on_retry: impl FnMut(u32, &anyhow::Error),
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Canceled.into()),
            result = op() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !(policy.is_retryable)(&err) {
            return Err(err);
        }
        if attempt == max_attempts {
            return Err(RetryError::Exhausted {
                attempts: max_attempts,
                source: err,
            }
            .into());
        }

        on_retry(attempt, &err);

        let mut delay = policy.backoff(attempt);
        if policy.jitter {
            let extra = delay.mul_f64(rand::rng().random_range(0.0..0.5));
            delay += extra;
        }
        warn!(attempt, max_attempts, ?delay, error = %err, "retrying after transient failure");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Canceled.into()),
            _ = tokio::time::sleep(delay) => {}
        }
    }

    unreachable!("retry loop returns from within")
}
