//! Retry with exponential backoff for errors that classify themselves
//!
//! An error is retried only while [`Retryable::is_retryable`] holds and the
//! policy has retries left; the final error is handed back unchanged.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Classifies an error as worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Scale each delay by a random factor in 0.7..1.3
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `retry` (zero-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let capped = (self.base_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());

        let scaled = if self.jitter {
            capped * rand::thread_rng().gen_range(0.7..1.3)
        } else {
            capped
        };

        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Run `f` until it succeeds, fails permanently, or the policy runs out
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut retry = 0;

    loop {
        let err = match f().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || retry >= policy.max_retries {
            if retry > 0 {
                warn!(operation, attempts = retry + 1, error = %err, "Giving up after retries");
            }
            return Err(err);
        }

        let delay = policy.delay_for(retry);
        retry += 1;

        warn!(
            operation,
            retry,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying failed call"
        );

        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum Fault {
        Busy,
        Rejected,
    }

    impl Display for Fault {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(match self {
                Fault::Busy => "busy",
                Fault::Rejected => "rejected",
            })
        }
    }

    impl Retryable for Fault {
        fn is_retryable(&self) -> bool {
            *self == Fault::Busy
        }
    }

    fn quick(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            jitter: false,
            ..RetryPolicy::default()
        }
    }

    /// Fails with `fault` for the first `failures` calls, then returns the call index
    fn flaky(
        calls: Arc<AtomicU32>,
        failures: u32,
        fault: fn() -> Fault,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, Fault>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < failures { Err(fault()) } else { Ok(n) })
        }
    }

    #[tokio::test]
    async fn test_first_success_is_returned() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(&quick(3), "op", flaky(calls.clone(), 0, || Fault::Busy)).await;

        assert_eq!(result, Ok(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_busy_errors_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(&quick(3), "op", flaky(calls.clone(), 2, || Fault::Busy)).await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(&quick(2), "op", flaky(calls.clone(), 10, || Fault::Busy)).await;

        assert_eq!(result, Err(Fault::Busy));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let result =
            with_retry(&quick(5), "op", flaky(calls.clone(), 10, || Fault::Rejected)).await;

        assert_eq!(result, Err(Fault::Rejected));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_makes_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(
            &RetryPolicy::none(),
            "op",
            flaky(calls.clone(), 10, || Fault::Busy),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delays_grow_and_cap() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            jitter: false,
            ..RetryPolicy::default()
        };

        let delays: Vec<u128> = (0..4).map(|r| policy.delay_for(r).as_millis()).collect();
        assert_eq!(delays, vec![10, 20, 40, 50]);
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };

        for _ in 0..100 {
            let ms = policy.delay_for(0).as_millis();
            assert!((69..=130).contains(&ms), "{ms}");
        }
    }
}
