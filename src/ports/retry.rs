//! RetryPolicy - the one call-with-timeout-and-bounded-retry primitive.
//!
//! All three external integrations (language understanding, market data,
//! transaction construction) go through this identically: a per-attempt
//! timeout, a capped number of attempts, and exponential backoff between
//! them. Only failures the error type classifies as retryable are retried -
//! validation rejections fail fast on the first attempt.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Classifies errors into transient (worth another attempt) and fatal.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Bounded retry with per-attempt timeout and exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Minimum 1.
    pub max_attempts: u32,
    /// Per-attempt deadline.
    pub timeout: Duration,
    /// Backoff before the second attempt; doubles each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(10),
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            ..Self::default()
        }
    }

    /// Sets the initial backoff delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// A policy that never retries (single attempt, same timeout).
    pub fn no_retries(timeout: Duration) -> Self {
        Self::new(1, timeout)
    }

    /// Runs `op` under this policy. `label` names the integration in logs.
    pub async fn call<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_err: Option<E> = None;

        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) if !err.is_retryable() => {
                    return Err(RetryError::Fatal(err));
                }
                Ok(Err(err)) => {
                    warn!(service = label, attempt, error = %err, "transient failure");
                    last_err = Some(err);
                }
                Err(_elapsed) => {
                    warn!(service = label, attempt, timeout_ms = self.timeout.as_millis() as u64, "attempt timed out");
                    last_err = None;
                }
            }

            if attempt < self.max_attempts {
                let backoff = self.base_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts,
            last: last_err,
        })
    }
}

/// Outcome of a failed policy run.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::fmt::Display> {
    /// A non-retryable failure; surfaced as-is, never reattempted.
    #[error("{0}")]
    Fatal(E),

    /// Every attempt failed transiently. `last` is None when the final
    /// attempt hit the per-attempt timeout.
    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32, last: Option<E> },
}

impl<E: std::fmt::Display> RetryError<E> {
    /// True when the failure was transient exhaustion rather than a fatal
    /// rejection.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable={})", self.retryable)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(50))
            .with_base_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result: Result<u32, _> = quick_policy(3)
            .call("test", move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result: Result<&str, _> = quick_policy(3)
            .call("test", move || {
                let calls = calls_in.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(TestError { retryable: true })
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_stop_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result: Result<(), _> = quick_policy(3)
            .call("test", move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError { retryable: false })
                }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count() {
        let result: Result<(), _> = quick_policy(3)
            .call("test", || async { Err::<(), _>(TestError { retryable: true }) })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(last.is_some());
            }
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn per_attempt_timeout_counts_as_transient() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10))
            .with_base_delay(Duration::from_millis(1));

        let result: Result<(), RetryError<TestError>> = policy
            .call("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(last.is_none());
            }
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn no_retries_policy_is_single_shot() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result: Result<(), _> = RetryPolicy::no_retries(Duration::from_millis(50))
            .call("test", move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(TestError { retryable: true })
                }
            })
            .await;

        assert!(result.unwrap_err().is_exhaustion());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
