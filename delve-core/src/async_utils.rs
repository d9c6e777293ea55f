//! Async utilities and patterns
//!
//! Retry with exponential backoff, timeouts and request throttling

use crate::error::{DelveError, DelveResult, ErrorContext};
use std::fmt::Display;
use std::future::Future;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, error, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: usize,
    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (exponential backoff)
    pub backoff_multiplier: f64,
    /// Whether to add +/-10% jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Doubling backoff starting at `base_delay_ms`
    pub fn exponential(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay_ms: base_delay_ms,
            ..Self::default()
        }
    }

    /// Delay slept after the failed attempt with 0-based index `attempt`
    pub fn delay_for(&self, attempt: usize) -> u64 {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let delay = ((self.initial_delay_ms as f64) * factor) as u64;
        delay.min(self.max_delay_ms)
    }
}

/// Retry an async operation with exponential backoff
///
/// The operation is invoked at most `max_attempts` times; the last error is
/// returned when every attempt fails.
pub async fn retry_async<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        debug!(
            operation = operation_name,
            attempt = attempt + 1,
            max_attempts = max_attempts,
            "Attempting operation"
        );

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt + 1 >= max_attempts {
                    error!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        error = %err,
                        "Operation failed after all retry attempts"
                    );
                    return Err(err);
                }

                let delay = config.delay_for(attempt);
                let actual_delay = if config.jitter {
                    let jitter = (fastrand::f64() - 0.5) * 0.2;
                    ((delay as f64) * (1.0 + jitter)) as u64
                } else {
                    delay
                };

                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %err,
                    delay_ms = actual_delay,
                    "Operation failed, retrying"
                );

                sleep(Duration::from_millis(actual_delay)).await;
                attempt += 1;
            }
        }
    }
}

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> DelveResult<T>
where
    F: Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(DelveError::Timeout {
            operation: operation_name.to_string(),
            duration_ms: timeout_ms,
            context: ErrorContext::new("async_utils")
                .with_operation("timeout")
                .with_metadata("timeout_ms", &timeout_ms.to_string())
                .with_suggestion("Increase timeout duration"),
        }),
    }
}

/// Enforces a minimum interval between successive calls
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: tokio::sync::Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last: tokio::sync::Mutex::new(None),
        }
    }

    /// Wait until at least `min_interval` has passed since the previous call
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let sleep_duration = self.min_interval - elapsed;
                debug!(
                    sleep_ms = sleep_duration.as_millis() as u64,
                    "Throttling: sleeping to enforce minimum interval"
                );
                sleep(sleep_duration).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delay_doubles() {
        let config = RetryConfig::exponential(3, 1000);
        assert_eq!(config.delay_for(0), 1000);
        assert_eq!(config.delay_for(1), 2000);
        assert_eq!(config.delay_for(2), 4000);
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let config = RetryConfig::exponential(3, 1);

        let result: Result<&str, String> = retry_async(
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(format!("failure {}", n))
                } else {
                    Ok("done")
                }
            },
            &config,
            "test",
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let config = RetryConfig::exponential(3, 1);

        let result: Result<(), String> = retry_async(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            },
            &config,
            "test",
        )
        .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(sleep(Duration::from_millis(200)), 10, "slow").await;
        assert!(matches!(result, Err(DelveError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_throttle_spaces_calls() {
        let throttle = Throttle::new(50);
        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
