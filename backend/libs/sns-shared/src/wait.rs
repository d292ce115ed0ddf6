use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Poll `check` until it returns true or `timeout` elapses
///
/// SNS listings are eventually consistent, so verification after a create or
/// delete has to poll with a bound instead of asserting once.
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(interval).await;
    }
}
