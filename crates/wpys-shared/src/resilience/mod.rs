//! # Resilience
//!
//! The circuit breaker and bounded-retry machinery guarding access to the
//! broker and result backends. Ambient infrastructure: it changes nothing
//! about request/response semantics when the breaker is closed, but keeps a
//! flaky out-of-process backend from hanging every caller.

pub mod behavior;
pub mod circuit_breaker;
pub mod metrics;

pub use behavior::CircuitBreakerBehavior;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerSettings, CircuitState};
pub use metrics::CircuitBreakerMetrics;

use std::future::Future;
use std::time::Duration;

use crate::errors::WpysError;

/// Retries `operation` up to `max_attempts` times with full jitter backoff,
/// only when the error is recoverable. Surfaces the last error otherwise.
pub async fn retry_with_jitter<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> Result<T, WpysError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WpysError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < max_attempts && err.is_recoverable() => {
                let jitter_ms = fastrand::u64(0..=base_delay.as_millis() as u64);
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn retries_recoverable_errors_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&attempts);
        let result = retry_with_jitter(5, Duration::from_millis(1), move || {
            let counted = Arc::clone(&counted);
            async move {
                let n = counted.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(WpysError::backend_error("transient"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_recoverable_errors() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&attempts);
        let result: Result<(), WpysError> = retry_with_jitter(5, Duration::from_millis(1), move || {
            let counted = Arc::clone(&counted);
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                Err(WpysError::not_found("job-1"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
