//! Retry with exponential backoff for transport failures.
//!
//! Server errors (5xx), rate limits (429) and connection problems are
//! retried. Every other failure is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use nomina_tool_runtime::LlmError;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first (default 2).
    pub max_retries: u32,
    /// Base delay in milliseconds (default 500).
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds (default 8000).
    pub max_delay_ms: u64,
    /// Backoff multiplier (default 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Calculate the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let clamped = delay_ms.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(clamped)
    }

    /// Delay before retrying after `error`. A server-supplied `Retry-After`
    /// wins over the computed backoff but is still capped.
    fn delay_after(&self, attempt: u32, error: &LlmError) -> Duration {
        match error {
            LlmError::RateLimited {
                retry_after_secs: Some(secs),
            } => Duration::from_secs(*secs).min(Duration::from_millis(self.max_delay_ms)),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

/// Execute an async operation, retrying while [`LlmError::is_retryable`] holds.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= policy.max_retries {
                    warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "max retries exceeded"
                    );
                    return Err(err);
                }

                let delay = policy.delay_after(attempt, &err);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    err = %err,
                    "retrying after error"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
