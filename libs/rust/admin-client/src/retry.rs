//! Fixed-delay retry of transient failures.
//!
//! Only errors on the transient allow-list (request timeout, 500, 502, 503,
//! 504) are re-issued. The delay between attempts is constant: no
//! exponential growth, no jitter.

use crate::error::{ClientError, ClientResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before each additional attempt
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Retry policy for executing requests with bounded re-issue.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Check if an error should be retried after `attempt` retries.
    ///
    /// An error that already went through a full retry sequence is never
    /// retried again.
    #[must_use]
    pub fn should_retry(&self, error: &ClientError, attempt: u32) -> bool {
        attempt < self.config.max_retries && error.is_transient() && !error.is_retry_exhausted()
    }

    /// Execute an async operation with retries.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once
    /// retries are exhausted. Transient errors returned from here are
    /// marked exhausted.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.should_retry(&error, attempt) {
                        if error.is_transient() {
                            if attempt > 0 {
                                warn!(code = error.code, attempts = attempt + 1, "retries exhausted");
                            }
                            return Err(error.exhausted());
                        }
                        return Err(error);
                    }
                    attempt += 1;
                    debug!(
                        code = error.code,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = u64::try_from(self.config.delay.as_millis()).unwrap_or(u64::MAX),
                        "retrying transient failure"
                    );
                    tokio::time::sleep(self.config.delay).await;
                }
            }
        }
    }

    /// Get the maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Get the delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.config.delay
    }
}
