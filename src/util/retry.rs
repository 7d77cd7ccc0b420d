//! Retry with a fixed delay or exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::EsiError;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for EsiError {
    fn is_retryable(&self) -> bool {
        EsiError::is_retryable(self)
    }
}

/// Why [`RetryPolicy::execute`] gave up.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// The operation failed with an error that retrying cannot fix.
    Fatal(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// The cancellation token fired before an attempt succeeded.
    Cancelled { attempts: u32 },
}

/// Retry policy configuration.
///
/// The default is the backpressure bound ESI clients traditionally use:
/// six attempts, ten seconds apart.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Backoff multiplier. `1.0` keeps the delay constant.
    pub multiplier: f64,
    /// Scale each delay by a factor in 75%–125%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::constant(6, Duration::from_secs(10))
    }
}

impl RetryPolicy {
    /// Fixed delay between attempts.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: delay,
            max_backoff: delay,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Doubling delay with jitter, capped at `max_backoff`.
    pub fn exponential(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            multiplier: 2.0,
            jitter: true,
        }
    }

    /// Execute an async operation with retry.
    pub async fn execute<F, Fut, T, E>(
        &self,
        cancel: Option<&CancellationToken>,
        mut operation: F,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;

        for attempt in 1..=max_attempts {
            let outcome = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(RetryFailure::Cancelled { attempts: attempt - 1 });
                    }
                    outcome = operation(attempt) => outcome,
                },
                None => operation(attempt).await,
            };

            let error = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(RetryFailure::Fatal(e)),
                Err(e) => e,
            };

            if attempt == max_attempts {
                return Err(RetryFailure::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let sleep_duration = if self.jitter {
                Duration::from_secs_f64(backoff.as_secs_f64() * (0.75 + rand_factor() * 0.5))
            } else {
                backoff
            };

            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = sleep_duration.as_millis() as u64,
                error = %error,
                "Retrying after error"
            );

            match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(RetryFailure::Cancelled { attempts: attempt });
                    }
                    _ = tokio::time::sleep(sleep_duration) => {}
                },
                None => tokio::time::sleep(sleep_duration).await,
            }

            backoff = Duration::from_secs_f64(
                (backoff.as_secs_f64() * self.multiplier).min(self.max_backoff.as_secs_f64()),
            );
        }

        Err(RetryFailure::Cancelled { attempts: 0 })
    }
}

/// Pseudo-random factor in [0, 1) seeded from the clock and thread id.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Flaky(bool);

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky(retryable={})", self.0)
        }
    }

    #[test]
    fn default_policy_is_six_constant_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 6);
        assert_eq!(policy.initial_backoff, Duration::from_secs(10));
        assert_eq!(policy.max_backoff, Duration::from_secs(10));
        assert!(!policy.jitter);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let policy = RetryPolicy::constant(3, Duration::from_secs(10));
        let result: Result<(), _> = policy
            .execute(None, |_| async { Err(Flaky(true)) })
            .await;
        match result {
            Err(RetryFailure::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_stops_immediately() {
        let policy = RetryPolicy::constant(5, Duration::from_secs(1));
        let mut calls = 0;
        let result: Result<(), _> = policy
            .execute(None, |_| {
                calls += 1;
                async { Err(Flaky(false)) }
            })
            .await;
        assert!(matches!(result, Err(RetryFailure::Fatal(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff_sleep() {
        let policy = RetryPolicy::constant(6, Duration::from_secs(3600));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let result: Result<(), _> = policy
            .execute(Some(&token), |_| async { Err(Flaky(true)) })
            .await;
        match result {
            Err(RetryFailure::Cancelled { attempts }) => assert_eq!(attempts, 1),
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy::exponential(
            4,
            Duration::from_millis(500),
            Duration::from_secs(2),
        );
        assert_eq!(policy.multiplier, 2.0);
        assert!(policy.jitter);
        assert_eq!(policy.max_backoff, Duration::from_secs(2));
    }
}
