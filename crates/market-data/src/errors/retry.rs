use std::future::Future;
use std::time::Duration;

use log::debug;

use super::MarketDataError;

/// Classification for retry policy.
///
/// | Class | Meaning |
/// |-------|---------|
/// | `Never` | Terminal for this call: bad symbol, error envelope, empty series, config |
/// | `WithBackoff` | Transport failure: a caller-owned [`RetryPolicy`] may try again |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry. The request is invalid or the provider has nothing to give.
    Never,

    /// Connection failure, timeout or non-2xx status.
    WithBackoff,
}

/// Exponential backoff applied around a single fetch.
///
/// The aggregator never retries on its own; this is the explicit wrapper a
/// caller opts into. Delay before retry `n` (1-based) is
/// `backoff_factor * 2^(n-1)`.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay multiplied by powers of two.
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Delay slept before the given retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_factor.saturating_mul(1u32 << exponent)
    }

    /// Run `op`, retrying only errors classified [`RetryClass::WithBackoff`].
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, MarketDataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retry_class() == RetryClass::WithBackoff && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    debug!("Retry {}/{} in {:?} after: {}", retry, self.max_retries, delay, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2), Duration::from_millis(600));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result = policy
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(MarketDataError::transport("FINNHUB", "HTTP 503"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), _> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MarketDataError::Timeout {
                    provider: "FINNHUB".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(MarketDataError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_no_data_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), _> = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MarketDataError::no_data("FINNHUB", "status no_data"))
            })
            .await;

        assert!(result.unwrap_err().is_no_data());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
