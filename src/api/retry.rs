//! Bounded exponential backoff for idempotent requests.

use std::{future::Future, time::Duration};

use log::debug;

use crate::{
    config::RetryConfig,
    error::ClientError,
    observer::{GameObserver, RetryEvent},
};

/// Retry policy of idempotent requests.
///
/// Retry `n` (1-based) waits `base_delay * 2^(n-1)`, capped at `max_delay`,
/// plus a random jitter of up to `jitter` times that delay. A rate limited
/// response with a `retry-after` hint waits for the hint instead, still
/// capped at `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use crawlerverse::api::RetryPolicy;
///
/// let policy = RetryPolicy::new(4, Duration::from_millis(100)).with_jitter(0.0);
/// assert_eq!(policy.delay_for(1), Duration::from_millis(100));
/// assert_eq!(policy.delay_for(3), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// Create a new [RetryPolicy] with the default cap and jitter.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts, the first one included. Zero is treated as one.
    /// * `base_delay` - Wait before the first retry.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..RetryPolicy::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy::new(1, Duration::ZERO)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Capped exponential delay before retry `retry`, without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn backoff(&self, retry: u32, error: &ClientError) -> Duration {
        if let Some(hint) = error.retry_after() {
            return hint.min(self.max_delay);
        }
        let delay = self.delay_for(retry);
        if self.jitter > 0.0 {
            delay + delay.mul_f64(self.jitter * rand::random::<f64>())
        } else {
            delay
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error
    /// or the attempts are exhausted.
    ///
    /// A [`RetryEvent`] is reported to `observer` before every wait. The
    /// last error is returned unchanged.
    ///
    /// Only wrap idempotent requests: the operation may run more than once.
    pub async fn execute<T, F, Fut>(
        &self,
        observer: &dyn GameObserver,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                debug!("{} failed with non-retryable {}", operation_name, error.kind());
                return Err(error);
            }
            if attempt >= self.max_attempts {
                debug!(
                    "{} failed with {}, giving up after {} attempts",
                    operation_name,
                    error.kind(),
                    attempt
                );
                return Err(error);
            }

            let delay = self.backoff(attempt, &error);
            observer.on_retry(&RetryEvent {
                operation: operation_name.to_owned(),
                attempt,
                delay,
                kind: error.kind(),
            });
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
