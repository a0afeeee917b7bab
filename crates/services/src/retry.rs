//! Bounded retries for calls that leave the process (media store, identity
//! provider). Each attempt runs under its own timeout; only
//! [`DomainError::is_retryable`] failures and timeouts are retried.

use std::future::Future;
use std::time::Duration;

use domains::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Deadline for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, still bounded by `attempt_timeout`.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self { max_retries: 0, attempt_timeout, ..Self::default() }
    }

    /// `initial_delay * multiplier^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(32) as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(DomainError::Upstream(format!(
                    "{operation} timed out after {}ms",
                    self.attempt_timeout.as_millis()
                ))),
            };
            match outcome {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(operation, attempt = attempt + 1, ?delay, error = %e, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
            attempt_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn delay_grows_and_is_capped() {
        let p = fast();
        assert_eq!(p.delay_for_attempt(0), Duration::from_millis(1));
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(2));
        assert_eq!(p.delay_for_attempt(10), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn retries_upstream_failures_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = fast()
            .run("flaky", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(DomainError::Upstream("unavailable".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(tokio_test::assert_ok!(result), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_domain_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<()> = fast()
            .run("rejecting", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DomainError::Validation("bad input".into()))
                }
            })
            .await;
        assert!(matches!(tokio_test::assert_err!(result), DomainError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeouts_surface_as_upstream_errors() {
        let policy = RetryPolicy { max_retries: 1, ..fast() };
        let result: Result<()> = policy
            .run("stuck", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(DomainError::Upstream(msg)) if msg.contains("timed out")));
    }
}
