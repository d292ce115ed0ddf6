/// Resilience helpers for calls to remote notification backends
///
/// Currently a single pattern: exponential-backoff retry limited to errors
/// that classify themselves as retryable (throttling, transient transport
/// faults).
///
/// # Example
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryPolicy, Retryable};
///
/// #[derive(Debug)]
/// struct Busy;
///
/// impl std::fmt::Display for Busy {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "busy")
///     }
/// }
///
/// impl Retryable for Busy {
///     fn is_retryable(&self) -> bool {
///         true
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let policy = RetryPolicy::default().with_max_retries(2);
///     let result = with_retry(&policy, "ping", || async { Ok::<_, Busy>(()) }).await;
///     assert!(result.is_ok());
/// }
/// ```

pub mod retry;

pub use retry::{with_retry, RetryPolicy, Retryable};
