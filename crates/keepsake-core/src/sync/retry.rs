//! Bounded exponential-backoff executor

use std::future::Future;
use std::time::Duration;

use super::{RemoteError, RemoteResult};

/// A bounded exponential-backoff schedule: the delay doubles after each
/// failed attempt (base, 2x, 4x, ...) up to a maximum attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts before giving up
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Budget for the inline replication attempt inside a mutation
    #[must_use]
    pub const fn inline() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Budget for queue draining
    #[must_use]
    pub const fn drain() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Delay to wait after the given zero-based failed attempt
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run an operation under this policy.
    ///
    /// Transient failures are retried with backoff until the budget is
    /// exhausted; terminal failures are returned immediately without
    /// consuming further attempts.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let mut last_error = RemoteError::Network("no attempts made".to_string());

        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    tracing::debug!(attempt, %error, "retryable failure");
                    last_error = error;
                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(self.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Zero-delay policy so tests don't sleep
    const fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::inline();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);

        let result = fast(3)
            .run(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RemoteError::Timeout)
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exhausts_budget_and_returns_last_error() {
        let attempts = AtomicU32::new(0);

        let result: RemoteResult<()> = fast(3)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::Server { status: 503 }) }
            })
            .await;

        assert_eq!(result.unwrap_err(), RemoteError::Server { status: 503 });
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_terminal_failure_stops_immediately() {
        let attempts = AtomicU32::new(0);

        let result: RemoteResult<()> = fast(5)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::Unauthorized) }
            })
            .await;

        assert_eq!(result.unwrap_err(), RemoteError::Unauthorized);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
