//! Bounded retry with a constant backoff.
//!
//! Every retried operation (click, type, navigate, API transport calls) goes
//! through [`retry`] or [`retry_if`] with a [`RetryPolicy`], so there is one
//! loop to reason about.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Default delay between attempts (1 second)
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Default attempts for interaction primitives
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, always at least 1
    max_attempts: u32,
    /// Constant delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(DEFAULT_BACKOFF_MS))
    }
}

impl RetryPolicy {
    /// Create a policy; zero attempts is raised to one
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            backoff,
        }
    }

    /// Policy from a user-facing retry count.
    ///
    /// `retries` is the total attempt budget. Zero and negative values mean
    /// exactly one attempt.
    #[must_use]
    pub fn from_retries(retries: i32) -> Self {
        let max_attempts = if retries <= 0 {
            1
        } else {
            retries.unsigned_abs()
        };
        Self::new(max_attempts, Duration::from_millis(DEFAULT_BACKOFF_MS))
    }

    /// A single attempt, no backoff
    #[must_use]
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Set the backoff
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Maximum attempts (at least 1)
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// All attempts failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted<E> {
    /// Attempts performed
    pub attempts: u32,
    /// Error of the last attempt
    pub last_error: E,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `op` receives the 1-based attempt index. The backoff is slept between
/// attempts, never after the last one.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_if(policy, op, |_| true).await
}

/// Like [`retry`], but stops early when `should_retry` rejects an error.
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut op: F,
    should_retry: P,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_attempts || !should_retry(&error) => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }
            Err(_) => {
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    mod policy_tests {
        use super::*;

        #[test]
        fn test_default_policy() {
            let policy = RetryPolicy::default();
            assert_eq!(policy.max_attempts(), 3);
            assert_eq!(policy.backoff, Duration::from_secs(1));
        }

        #[test]
        fn test_zero_attempts_is_one() {
            assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
        }

        #[test]
        fn test_from_retries_edge_values() {
            assert_eq!(RetryPolicy::from_retries(0).max_attempts(), 1);
            assert_eq!(RetryPolicy::from_retries(-5).max_attempts(), 1);
            assert_eq!(RetryPolicy::from_retries(i32::MIN).max_attempts(), 1);
            assert_eq!(RetryPolicy::from_retries(1).max_attempts(), 1);
            assert_eq!(RetryPolicy::from_retries(4).max_attempts(), 4);
        }

        proptest! {
            #[test]
            fn prop_non_positive_retries_mean_one_attempt(r in i32::MIN..=0) {
                prop_assert_eq!(RetryPolicy::from_retries(r).max_attempts(), 1);
            }

            #[test]
            fn prop_positive_retries_are_the_budget(r in 1i32..=1000) {
                prop_assert_eq!(RetryPolicy::from_retries(r).max_attempts(), r as u32);
            }
        }
    }

    mod combinator_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_success_on_first_attempt() {
            let calls = Cell::new(0);
            let result: Result<u32, RetryExhausted<String>> =
                retry(&RetryPolicy::default(), |attempt| {
                    calls.set(calls.get() + 1);
                    async move { Ok(attempt) }
                })
                .await;
            assert_eq!(result.unwrap(), 1);
            assert_eq!(calls.get(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_success_after_failures() {
            let result: Result<u32, RetryExhausted<String>> =
                retry(&RetryPolicy::default(), |attempt| async move {
                    if attempt < 3 {
                        Err(format!("flaky {attempt}"))
                    } else {
                        Ok(attempt)
                    }
                })
                .await;
            assert_eq!(result.unwrap(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhaustion_reports_last_error_and_attempts() {
            let start = tokio::time::Instant::now();
            let result: Result<(), RetryExhausted<String>> =
                retry(&RetryPolicy::from_retries(3), |attempt| async move {
                    Err(format!("failure {attempt}"))
                })
                .await;
            let err = result.unwrap_err();
            assert_eq!(err.attempts, 3);
            assert_eq!(err.last_error, "failure 3");
            // two backoffs between three attempts, constant not exponential
            assert_eq!(start.elapsed(), Duration::from_secs(2));
        }

        #[tokio::test(start_paused = true)]
        async fn test_single_attempt_never_sleeps() {
            let start = tokio::time::Instant::now();
            let result: Result<(), RetryExhausted<&str>> =
                retry(&RetryPolicy::from_retries(0), |_| async { Err("nope") }).await;
            assert_eq!(result.unwrap_err().attempts, 1);
            assert_eq!(start.elapsed(), Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_if_stops_on_fatal_error() {
            let result: Result<(), RetryExhausted<&str>> = retry_if(
                &RetryPolicy::from_retries(5),
                |_| async { Err("fatal") },
                |e| *e != "fatal",
            )
            .await;
            assert_eq!(result.unwrap_err().attempts, 1);
        }

        #[test]
        fn test_exhausted_display() {
            let err = RetryExhausted {
                attempts: 2,
                last_error: "boom",
            };
            assert_eq!(err.to_string(), "failed after 2 attempt(s): boom");
        }
    }
}
