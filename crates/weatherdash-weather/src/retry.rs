//! Retry with exponential backoff.
//!
//! Every failure is treated as retryable: the operation runs once, then up to
//! `max_attempts` more times, sleeping `base_delay * 2^i` before retry `i + 1`
//! (1s, 2s, 4s with the defaults). There is no jitter and no cap.

use std::future::Future;
use std::time::Duration;

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each attempt)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Zero values are raised to the smallest legal policy (1 retry, 1 ms).
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms.max(1)),
        }
    }

    /// Delay slept after failed attempt `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Total number of calls made when every attempt fails
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }

    /// Run `operation` under this policy. See [`with_retry`].
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        with_retry(self, operation).await
    }
}

/// Failure of the last attempt once the retry budget is spent.
#[derive(Debug)]
pub struct RetryError<E> {
    attempts: u32,
    last_error: E,
}

impl<E> RetryError<E> {
    pub fn new(attempts: u32, last_error: E) -> Self {
        Self {
            attempts,
            last_error,
        }
    }

    /// Number of calls made before giving up (0 if the request was rejected up front)
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> &E {
        &self.last_error
    }

    pub fn into_inner(self) -> E {
        self.last_error
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed after {} attempt(s): {}", self.attempts, self.last_error)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last_error)
    }
}

/// Execute an async operation with retry logic.
///
/// # Returns
/// The first successful result, or the last error wrapped in [`RetryError`]
/// after `policy.max_attempts` retries.
///
/// # Example
/// ```ignore
/// let body = with_retry(&RetryPolicy::default(), || async {
///     client.get(url).send().await?.error_for_status()
/// })
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("Request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::error!(
                    "All {} attempts exhausted, last error: {}",
                    policy.total_attempts(),
                    e
                );
                return Err(RetryError::new(attempt + 1, e));
            }
            Err(e) => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    "Attempt {} of {} failed: {}; retrying in {:?}",
                    attempt + 1,
                    policy.total_attempts(),
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
