//! Retry utilities for async operations
//!
//! Bounded retry with exponential backoff and optional jitter, used for writes
//! that must not be lost to a transient backend failure.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Configuration for retrying failed operations
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Never less than one.
    pub max_attempts: usize,

    /// Delay before the first retry
    pub initial_interval: Duration,

    /// Multiplier for the interval after each retry
    pub backoff_factor: f64,

    /// Upper bound for any single delay
    pub max_interval: Duration,

    /// Whether to add random jitter to intervals
    pub jitter: bool,
}

impl RetryPolicy {
    /// Create a new retry policy with the given max attempts
    ///
    /// ```rust
    /// use tooling::async_utils::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3);
    /// assert_eq!(policy.max_attempts, 3);
    ///
    /// // zero is clamped so the operation always runs once
    /// assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    /// ```
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_interval: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(30),
            jitter: true,
        }
    }

    /// Policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    ///
    /// `initial_interval * backoff_factor ^ attempt`, capped at `max_interval`.
    /// Jitter scales the result by a random factor in `[0.5, 1.5]`.
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        if attempt + 1 >= self.max_attempts {
            return Duration::ZERO;
        }

        let base = self.initial_interval.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_interval.as_secs_f64()).max(0.0);

        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..=1.5)
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn should_retry(&self, attempts: usize) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Execute an async operation, retrying failures according to `policy`.
///
/// Returns the first success, or the error from the final attempt.
/// `label` only appears in log output.
///
/// ```rust,ignore
/// let policy = RetryPolicy::new(3);
/// let record = with_retry(&policy, "terminal checkpoint", || store.save(write.clone())).await?;
/// ```
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, label: &str, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(policy, label, |_| true, operation).await
}

/// Like [`with_retry`], but stops at the first error `retryable` rejects.
pub async fn with_retry_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    label: &str,
    retryable: P,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(label, attempts = attempt + 1, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(error) => {
                attempt += 1;
                if !retryable(&error) {
                    tracing::warn!(label, attempts = attempt, error = %error, "Permanent failure");
                    return Err(error);
                }
                if !policy.should_retry(attempt) {
                    tracing::warn!(label, attempts = attempt, error = %error, "Giving up");
                    return Err(error);
                }

                let delay = policy.calculate_delay(attempt - 1);
                tracing::debug!(label, attempt, error = %error, ?delay, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast_policy(attempts: usize) -> RetryPolicy {
        RetryPolicy::new(attempts)
            .with_initial_interval(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::new(10)
            .with_initial_interval(Duration::from_millis(125))
            .with_max_interval(Duration::from_millis(500))
            .with_jitter(false);

        assert_eq!(policy.calculate_delay(0), Duration::from_millis(125));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(250));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(500));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(500));
    }

    #[test]
    fn test_no_delay_after_last_attempt() {
        let policy = fast_policy(2);
        assert_eq!(policy.calculate_delay(1), Duration::ZERO);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::new(5).with_initial_interval(Duration::from_millis(100));
        for _ in 0..50 {
            let delay = policy.calculate_delay(0);
            assert!(delay >= Duration::from_millis(49));
            assert!(delay <= Duration::from_millis(151));
        }
    }

    #[tokio::test]
    async fn test_with_retry_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = fast_policy(3);

        let result: Result<&str, String> = with_retry(&policy, "flaky", || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_returns_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = fast_policy(2);

        let result: Result<(), String> = with_retry(&policy, "broken", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure {}", n))
            }
        })
        .await;

        assert_eq!(result, Err("failure 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), &str> = with_retry(&RetryPolicy::no_retry(), "once", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_if_stops_on_permanent_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = fast_policy(5);

        let result: Result<(), String> = with_retry_if(
            &policy,
            "permanent",
            |err: &String| err != "rejected",
            || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("transient".to_string())
                    } else {
                        Err("rejected".to_string())
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Err("rejected".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
