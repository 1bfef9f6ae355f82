use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Execute an async operation with jittered exponential backoff
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_backoff_notify(config, operation, |_, _, _| {}).await
}

/// Same as [`retry_with_backoff`], calling `on_retry(attempt, error, delay)`
/// before each backoff sleep
pub async fn retry_with_backoff_notify<F, Fut, T, E, N>(
    config: &RetryConfig,
    mut operation: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    N: FnMut(u32, &E, Duration),
{
    let max_attempts = config.max_attempts.max(1);
    let base_ms = config.backoff_base_ms;
    let mut attempts = 0;
    let mut backoff_ms = base_ms;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempts >= max_attempts => {
                warn!("All {} attempts failed: {}", attempts, e);
                return Err(e);
            }
            Err(e) => {
                // Jittered backoff: base * 2^attempt + random(0..base)
                let jitter = if base_ms > 0 {
                    rand::random::<u64>() % base_ms
                } else {
                    0
                };
                let delay = Duration::from_millis(backoff_ms.saturating_add(jitter));

                warn!(
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    attempts, e, delay
                );
                on_retry(attempts, &e, delay);

                sleep(delay).await;
                backoff_ms = backoff_ms.saturating_mul(2);
            }
        }
    }
}
