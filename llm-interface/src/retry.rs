//! Backoff for transient backend failures inside a single provider call.
//!
//! Only rate limits, 5xx answers and timeouts are retried here. Oversized
//! input and unusable tool output go straight back to the caller, where the
//! truncation layer decides what to do with them.

use needfinder_core::{CoreError, ErrorExt, LlmConfig, LlmError};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per call, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Extra random delay as a fraction of the backoff (0.0 to 1.0).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Fan-out sends many calls at once, so jitter is wide enough to spread
    /// the retries that follow a shared rate limit.
    pub fn llm(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: 2000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.3,
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (scaled as u64).min(self.max_delay_ms);
        let jitter_ms = fastrand::u64(0..=(delay_ms as f64 * self.jitter_factor) as u64);
        Duration::from_millis((delay_ms + jitter_ms).min(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    Backoff,
    /// The provider said how long to wait.
    After(Duration),
    GiveUp,
}

impl RetryStrategy {
    pub fn for_error(error: &CoreError) -> Self {
        match error {
            CoreError::Llm(LlmError::RateLimitExceeded { retry_after, .. }) => {
                RetryStrategy::After(Duration::from_secs(*retry_after))
            }
            CoreError::Llm(LlmError::ServiceUnavailable { .. })
            | CoreError::Llm(LlmError::RequestTimeout { .. }) => RetryStrategy::Backoff,
            CoreError::Network(e) if e.is_timeout() || e.is_connect() => RetryStrategy::Backoff,
            _ => RetryStrategy::GiveUp,
        }
    }
}

/// Per-handle retry loop. Stateless, so cloned providers never coordinate.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails permanently, or runs out of
    /// attempts. The last error is returned as-is.
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let delay = match RetryStrategy::for_error(&error) {
                RetryStrategy::GiveUp => return Err(error),
                _ if attempt + 1 >= max_attempts => {
                    warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        code = error.error_code(),
                        "Giving up: {}",
                        error.user_friendly_message()
                    );
                    return Err(error);
                }
                RetryStrategy::Backoff => self.config.backoff(attempt),
                RetryStrategy::After(wait) => {
                    wait.min(Duration::from_millis(self.config.max_delay_ms))
                }
            };

            debug!(
                operation = operation_name,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying: {}",
                error
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
