//! Fixed-delay retry policy for event fetches.
//!
//! Wraps a whole paginated fetch, so a failure on any page restarts the walk
//! from the first page.

use std::future::Future;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use tracing::warn;

use crate::config::RetryConfig;

/// Number of tries and the pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one.
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    /// - Attempts: 7
    /// - Delay: 100ms
    fn default() -> Self {
        Self {
            attempts: 7,
            delay: Duration::from_millis(100),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy.
    pub fn immediate(attempts: usize) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }

    /// Backoff builder yielding `attempts - 1` retries after the first try.
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.attempts.saturating_sub(1))
    }

    /// Run `operation` until it succeeds or all attempts are used up.
    ///
    /// The last error is returned when every attempt fails.
    pub async fn run<T, E, F, Fut>(&self, what: &str, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        operation
            .retry(self.backoff())
            .notify(|err: &E, dur: Duration| {
                warn!(operation = %what, error = %err, delay = ?dur, "Attempt failed, retrying");
            })
            .await
    }
}
