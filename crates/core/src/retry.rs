//! Bounded retry with a fixed backoff.
//!
//! Freshly started containers reject requests for a while after their port
//! opens. Wrapping each REST call in [`retry`] absorbs that window while still
//! failing fast on errors the caller does not classify as retryable.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times to invoke an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations, including the first one. Zero behaves like one.
    pub attempts: u32,
    /// Fixed delay between invocations.
    pub delay: Duration,
    /// Dry-run: invoke exactly once, never sleep.
    pub dry_run: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(3),
            dry_run: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Run `operation` under `policy`.
///
/// Errors for which `is_retryable` returns `true` are retried until the
/// attempt budget is spent, after which the last error is returned. Any other
/// error is returned straight away.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    if policy.dry_run {
        return operation().await;
    }

    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}/{}", label, attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts && is_retryable(&e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label, attempt, attempts, e, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn transient(e: &TestError) -> bool {
        matches!(e, TestError::Transient)
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        let calls = AtomicU32::new(0);
        let result = retry(&fast_policy(5), "flaky", transient, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= 3 {
                Err(TestError::Transient)
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&fast_policy(5), "always", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient)
        })
        .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry(&fast_policy(5), "fatal", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Fatal)
        })
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dry_run_invokes_once() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(5).with_dry_run(true);
        let result: Result<(), _> = retry(&policy, "dry", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_delay_between_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_secs(3));
        let started = tokio::time::Instant::now();
        let _: Result<(), _> = retry(&policy, "timed", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_zero_attempts_behaves_like_one() {
        let calls = AtomicU32::new(0);
        let _: Result<(), _> = retry(&fast_policy(0), "zero", transient, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient)
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
