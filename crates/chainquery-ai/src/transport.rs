//! Shared HTTP plumbing for the hosted providers.

use anyhow::{anyhow, Context, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// First retry waits this long; each further retry doubles it
const BACKOFF_BASE: Duration = Duration::from_millis(500);

pub(crate) fn backoff_delay(retry: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(retry.saturating_sub(1))
}

/// Run `call` once plus up to `max_retries` more times.
pub(crate) async fn with_backoff<T, F, Fut>(label: &str, max_retries: u32, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if retry < max_retries => {
                retry += 1;
                warn!(
                    "{} request failed (attempt {}/{}): {:#}",
                    label,
                    retry,
                    max_retries + 1,
                    e
                );
                tokio::time::sleep(backoff_delay(retry)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decode a successful JSON body, or turn the status and body text into an error.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, label: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(anyhow!("{} returned {}: {}", label, status, body));
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("{} response did not match the expected shape", label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles_per_retry() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let value = with_backoff("test", 2, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("flaky"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff("test", 1, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("down"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
