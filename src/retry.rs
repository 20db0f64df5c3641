//! Exponential backoff retry for git and API operations.
//!
//! Every effect a worker executes goes through [`retry_with_backoff`]. Errors
//! classify themselves via [`Retriable`]: transient failures (network errors,
//! HTTP 5xx/429, a failed `git fetch`) are retried with growing delays,
//! permanent failures (HTTP 4xx, git binary missing) are returned immediately.
//!
//! - Default: 3 retries with 2s, 4s, 8s delays (steady-state queue items)
//! - Recovery: 10 retries with 1s base, 30s cap (bootstrap)

use std::future::Future;
use std::time::Duration;

/// Classifies an error for retry decisions.
pub trait Retriable {
    /// Returns true if repeating the operation may succeed.
    fn is_retriable(&self) -> bool;
}

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential growth).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default retry configuration for queue items.
    ///
    /// - 3 retries with 2s, 4s, 8s delays
    /// - Total max wait: ~14 seconds
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    /// Retry configuration for bootstrap.
    ///
    /// A repository whose bootstrap fails stays offline until restart, so
    /// bootstrap rides out longer outages than a single queue item does.
    ///
    /// - 10 retries with 1s base, 30s cap
    /// - Total max wait: ~180 seconds
    pub const RECOVERY: Self = Self {
        max_retries: 10,
        initial_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    /// Creates a new retry configuration.
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay for the given retry attempt (0-indexed).
    ///
    /// The delay grows exponentially: `initial_delay * backoff_multiplier^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns an iterator over all retry delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }

    /// Computes the total maximum wait time for all retries.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of a retry attempt.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// The operation succeeded.
    Success(T),

    /// A transient error occurred after exhausting all retries.
    ExhaustedRetries {
        /// The last error encountered.
        last_error: E,
        /// Number of attempts made (including the initial attempt).
        attempts: u32,
    },

    /// A permanent error occurred (not retriable).
    PermanentError(E),
}

/// Executes an async operation with retry logic.
///
/// The operation is retried according to `config` while it returns a
/// retriable error. Permanent errors are returned immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: RetryConfig,
    mut operation: F,
) -> RetryResult<T, E>
where
    E: Retriable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => {
                attempt += 1;

                if !e.is_retriable() {
                    return RetryResult::PermanentError(e);
                }
                if attempt >= max_attempts {
                    return RetryResult::ExhaustedRetries {
                        last_error: e,
                        attempts: attempt,
                    };
                }

                let delay = config.delay_for_attempt(attempt - 1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
