/*
 * Bounded retry with exponential backoff for transient transport failures
 */

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::{ChainError, ChainResult};

const MAX_ATTEMPTS: usize = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Retry `op` on transport failures only. Reverts and malformed responses
/// are deterministic for a given chain state and return immediately.
pub(crate) async fn with_retries<F, Fut, T>(mut op: F) -> ChainResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ChainResult<T>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match op().await {
            Err(ChainError::Transport(msg)) if attempt < MAX_ATTEMPTS => {
                debug!(attempt, error = %msg, "transient transport failure, retrying");
                sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn transport_failures_retry_until_success() {
        let counter = AtomicUsize::new(0);
        let result = with_retries(|| {
            let current = counter.fetch_add(1, Ordering::Relaxed);
            async move {
                if current < 2 {
                    Err(ChainError::Transport("connection reset".to_string()))
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn reverts_return_immediately() {
        let counter = AtomicUsize::new(0);
        let result: ChainResult<u32> = with_retries(|| {
            counter.fetch_add(1, Ordering::Relaxed);
            async { Err(ChainError::Revert("no pool".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ChainError::Revert(_))));
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let counter = AtomicUsize::new(0);
        let result: ChainResult<u32> = with_retries(|| {
            counter.fetch_add(1, Ordering::Relaxed);
            async { Err(ChainError::Transport("gateway unreachable".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ChainError::Transport(_))));
        assert_eq!(counter.load(Ordering::Relaxed), MAX_ATTEMPTS);
    }
}
