//! Minimum-interval gate for quota-limited providers.
//!
//! Each provider gets its own lane holding the last dispatch time behind a
//! FIFO async mutex. Callers for the same provider queue on that mutex in
//! arrival order; the holder sleeps until `last_call + min_interval`, stamps
//! the dispatch time and releases. Different providers never contend.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use log::debug;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::MarketDataError;

/// Gate state for a single provider.
#[derive(Debug)]
struct Lane {
    min_interval: Duration,
    /// Last dispatch time. Written only after the wait completed.
    last_call: Mutex<Option<Instant>>,
}

impl Lane {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }
}

/// Per-provider minimum-interval gate.
///
/// Shared by every fetcher of a process (wrap it in an `Arc`). Lanes are
/// created on first use with the default interval, or pre-configured with
/// [`RateGate::configure`].
#[derive(Debug)]
pub struct RateGate {
    default_min_interval: Duration,
    lanes: DashMap<String, Arc<Lane>>,
}

impl RateGate {
    pub fn new(default_min_interval: Duration) -> Self {
        Self {
            default_min_interval,
            lanes: DashMap::new(),
        }
    }

    /// Set the minimum interval for a provider.
    ///
    /// Replaces the provider's lane, forgetting its last dispatch time, so
    /// call it at startup before any traffic.
    pub fn configure(&self, provider: &str, min_interval: Duration) {
        self.lanes
            .insert(provider.to_string(), Arc::new(Lane::new(min_interval)));
    }

    /// Minimum interval currently applied to a provider.
    pub fn min_interval(&self, provider: &str) -> Duration {
        self.lanes
            .get(provider)
            .map(|lane| lane.min_interval)
            .unwrap_or(self.default_min_interval)
    }

    fn lane(&self, provider: &str) -> Arc<Lane> {
        self.lanes
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Lane::new(self.default_min_interval)))
            .value()
            .clone()
    }

    /// Wait until the provider may be called again, then record the dispatch.
    ///
    /// Dropping the returned future mid-wait leaves the last dispatch time
    /// untouched.
    pub async fn acquire(&self, provider: &str) {
        let lane = self.lane(provider);
        let mut last_call = lane.last_call.lock().await;

        if let Some(previous) = *last_call {
            let ready_at = previous + lane.min_interval;
            let now = Instant::now();
            if now < ready_at {
                debug!(
                    "Rate gate: waiting {:?} for provider '{}'",
                    ready_at - now,
                    provider
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
        debug!("Rate gate: dispatch to '{}'", provider);
    }

    /// [`acquire`](Self::acquire) bounded by a deadline.
    ///
    /// Expiry is reported as [`MarketDataError::Timeout`]; the abandoned wait
    /// does not advance the provider's last dispatch time.
    pub async fn acquire_timeout(
        &self,
        provider: &str,
        timeout: Duration,
    ) -> Result<(), MarketDataError> {
        tokio::time::timeout(timeout, self.acquire(provider))
            .await
            .map_err(|_| MarketDataError::Timeout {
                provider: provider.to_string(),
            })
    }

    /// Last recorded dispatch time for a provider, if any.
    pub async fn last_call(&self, provider: &str) -> Option<Instant> {
        let lane = self.lanes.get(provider)?.value().clone();
        let last_call = lane.last_call.lock().await;
        *last_call
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_secs(12);

    fn gate() -> RateGate {
        let gate = RateGate::default();
        gate.configure("ALPHA_VANTAGE", INTERVAL);
        gate
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let gate = gate();
        let start = Instant::now();
        gate.acquire("ALPHA_VANTAGE").await;
        assert_eq!(Instant::now(), start);
        assert_eq!(gate.last_call("ALPHA_VANTAGE").await, Some(start));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_are_spaced() {
        let gate = gate();
        let mut dispatches = Vec::new();

        for _ in 0..5 {
            gate.acquire("ALPHA_VANTAGE").await;
            dispatches.push(Instant::now());
        }

        for pair in dispatches.windows(2) {
            assert!(pair[1] - pair[0] >= INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        let gate = Arc::new(gate());
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    gate.acquire("ALPHA_VANTAGE").await;
                    Instant::now()
                })
            })
            .collect();

        let mut dispatches = Vec::new();
        for handle in handles {
            dispatches.push(handle.await.unwrap());
        }
        dispatches.sort();

        assert_eq!(dispatches.len(), 6);
        for pair in dispatches.windows(2) {
            assert!(pair[1] - pair[0] >= INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_providers_are_isolated() {
        let gate = gate();
        gate.configure("FINNHUB", Duration::from_secs(1));

        let start = Instant::now();
        gate.acquire("ALPHA_VANTAGE").await;
        gate.acquire("FINNHUB").await;
        assert_eq!(Instant::now(), start);

        gate.acquire("FINNHUB").await;
        assert_eq!(Instant::now() - start, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_provider_uses_default() {
        let gate = RateGate::new(Duration::from_secs(2));
        assert_eq!(gate.min_interval("OTHER"), Duration::from_secs(2));

        let start = Instant::now();
        gate.acquire("OTHER").await;
        gate.acquire("OTHER").await;
        assert_eq!(Instant::now() - start, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_does_not_advance_last_call() {
        let gate = gate();
        gate.acquire("ALPHA_VANTAGE").await;
        let first = gate.last_call("ALPHA_VANTAGE").await.unwrap();

        let result = gate
            .acquire_timeout("ALPHA_VANTAGE", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(MarketDataError::Timeout { .. })));
        assert_eq!(gate.last_call("ALPHA_VANTAGE").await, Some(first));

        gate.acquire("ALPHA_VANTAGE").await;
        let second = gate.last_call("ALPHA_VANTAGE").await.unwrap();
        assert_eq!(second - first, INTERVAL);
    }
}
