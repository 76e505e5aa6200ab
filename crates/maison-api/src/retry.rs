// Retry with exponential backoff for the hosted backend
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Run an operation, waiting progressively longer between failed attempts
///
/// `should_retry` decides which errors are worth another attempt; anything
/// it rejects is returned immediately. A 401 never gets better by asking
/// again, so burning the backoff budget on it just delays the fallback.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("Request succeeded after {} retries", attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !should_retry(&err) {
                    debug!("Request failed without retry: {}", err);
                    return Err(err);
                }
                attempt += 1;

                if attempt > config.max_retries {
                    warn!(
                        "Request failed after {} attempts: {}",
                        config.max_retries, err
                    );
                    return Err(err);
                }

                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {}ms...",
                    attempt, config.max_retries, err, delay_ms
                );

                sleep(Duration::from_millis(delay_ms)).await;

                delay_ms = ((delay_ms as f64) * config.backoff_multiplier) as u64;
                delay_ms = delay_ms.min(config.max_delay_ms);
            }
        }
    }
}

/// Whether an HTTP status is worth another attempt
///
/// 5xx means the backend is struggling, 429 means we got rate limited,
/// 408 is a plain timeout. Client errors like 404 never get better by
/// asking again.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            initial_delay_ms: 5,
            max_delay_ms: 20,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(), |_: &&str| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &str>("ok")
        })
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(), |_: &&str| true, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err("flaky")
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn gives_up_after_budget_exhausted() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(), |_: &&str| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("down")
        })
        .await;

        assert_eq!(result, Err("down"));
        // Initial attempt plus two retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_on_the_first_attempt() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(), |e: &&str| *e != "bad key", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("bad key")
        })
        .await;

        assert_eq!(result, Err("bad key"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert!(is_retryable_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(reqwest::StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(reqwest::StatusCode::UNAUTHORIZED));
    }
}
