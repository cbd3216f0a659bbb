//! Single automatic retry for network-bound calls.
//!
//! Store and lookup calls get exactly one retry after a fixed delay. A second
//! failure is returned to the caller, which turns it into a recoverable state.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Default delay before the retry attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Runs `attempt`, and once more after `delay` if the first call fails.
pub async fn retry_once<T, E, F, Fut>(operation: &str, delay: Duration, mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match attempt().await {
        Ok(value) => Ok(value),
        Err(first) => {
            debug!(
                operation,
                error = %first,
                retry_in_ms = delay.as_millis() as u64,
                "Call failed, retrying once"
            );
            tokio::time::sleep(delay).await;
            attempt().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_success_does_not_retry() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retry_once("op", DEFAULT_RETRY_DELAY, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_once_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<u32, String> = retry_once("op", Duration::from_millis(250), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("flaky".to_string())
                } else {
                    Ok(1)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_second_failure() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retry_once("op", DEFAULT_RETRY_DELAY, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {}", n)) }
        })
        .await;

        assert_eq!(result, Err("failure 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
