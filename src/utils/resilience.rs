//! Retry and timeout combinators for flaky asynchronous calls
//!
//! The two wrappers nest in either order. `with_retry(|| with_timeout(op(), t), ..)`
//! gives every attempt a fresh timeout window; `with_timeout(with_retry(..), t)`
//! bounds the whole retry loop instead.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default number of attempts made by [`with_retry`]
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default timeout applied by [`with_timeout`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Raised when a guarded operation does not finish in time
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation timed out after {duration_ms}ms")]
pub struct OperationTimeout {
    pub duration_ms: u64,
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: usize,
    pub base_delay: Duration,
    /// Upper bound for a single backoff sleep
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Backoff before the retry that follows attempt `attempt_index` (0-based)
    pub fn delay_for(&self, attempt_index: usize) -> Duration {
        let factor = 2_u32.saturating_pow(attempt_index.min(31) as u32);
        let delay = self.base_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Run `operation` under this policy
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt + 1 >= attempts => return Err(error),
                Err(error) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Retry `operation` up to `max_attempts` times with exponential backoff
///
/// The sleep between attempt `i` and `i + 1` is `base_delay * 2^i`. The error
/// from the final attempt is returned as-is.
pub async fn with_retry<F, Fut, T, E>(
    operation: F,
    max_attempts: usize,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    RetryPolicy::new(max_attempts, base_delay)
        .execute(operation)
        .await
}

/// Fail with [`OperationTimeout`] if `operation` has not resolved within `timeout`
///
/// On expiry the operation's future is dropped and never polled again. Work it
/// already handed off elsewhere (spawned tasks, child processes) keeps running.
pub async fn with_timeout<Fut, T, E>(operation: Fut, timeout: Duration) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<OperationTimeout>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(OperationTimeout {
            duration_ms: timeout.as_millis() as u64,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::CliError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_retry_success_after_failure() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let counter = attempt_count.clone();

        let result: Result<&str, CliError> = with_retry(
            move || {
                let count = counter.clone();
                async move {
                    let current = count.fetch_add(1, Ordering::SeqCst);
                    if current < 2 {
                        Err(CliError::unknown("flaky"))
                    } else {
                        Ok("success")
                    }
                }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let counter = attempt_count.clone();

        let result: Result<(), CliError> = with_retry(
            move || {
                let count = counter.clone();
                async move {
                    let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(CliError::unknown(format!("failure {}", n)))
                }
            },
            4,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(attempt_count.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err().to_string(), "Unknown error: failure 4");
    }

    #[tokio::test]
    async fn test_first_success_makes_no_further_calls() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let counter = attempt_count.clone();

        let result: Result<u32, CliError> = with_retry(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            },
            5,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backoff_is_exponential() {
        let start = Instant::now();
        let result: Result<(), String> = with_retry(
            || async { Err("x".to_string()) },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap_err(), "x");
        // 10ms after the first attempt, 20ms after the second
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let counter = attempt_count.clone();

        let result: Result<(), String> = with_retry(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("nope".to_string()) }
            },
            0,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_for_respects_cap() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500))
            .with_max_delay(Duration::from_millis(1500));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_timeout_fires_before_slow_operation() {
        let start = Instant::now();
        let result: Result<(), CliError> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            },
            Duration::from_millis(50),
        )
        .await;

        let elapsed = start.elapsed();
        assert!(matches!(result, Err(CliError::Timeout { timeout_ms: 50 })));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_timeout_passes_through_fast_result() {
        let result: Result<u8, OperationTimeout> =
            with_timeout(async { Ok(1) }, Duration::from_millis(100)).await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn test_retry_of_timeout_restarts_window() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let counter = attempt_count.clone();

        // First attempt hangs past the window, second answers quickly.
        let result: Result<&str, CliError> = with_retry(
            move || {
                let count = counter.clone();
                with_timeout(
                    async move {
                        if count.fetch_add(1, Ordering::SeqCst) == 0 {
                            tokio::time::sleep(Duration::from_millis(200)).await;
                        }
                        Ok("done")
                    },
                    Duration::from_millis(40),
                )
            },
            2,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }
}
