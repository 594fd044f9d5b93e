//! Retry with exponential backoff for transient transport failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{TransportError, TransportResult};

/// The last error of an operation that did not succeed, with the attempt count.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RetryFailure {
    pub attempts: u32,
    pub error: TransportError,
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// has been retried `max_retries` times.
pub(crate) async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TransportResult<T>>,
{
    let mut delay = retry.initial_delay();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(attempts = attempts, "Query succeeded after retries");
                }
                return Ok(value);
            }
            Err(error) => {
                if !error.is_transient() || attempts > retry.max_retries {
                    return Err(RetryFailure { attempts, error });
                }

                warn!(
                    attempt = attempts,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Query attempt failed, retrying"
                );

                sleep(delay).await;
                delay = std::cmp::min(
                    Duration::from_secs_f64(delay.as_secs_f64() * retry.backoff_multiplier),
                    retry.max_delay(),
                );
            }
        }
    }
}
