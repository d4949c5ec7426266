//! Opt-in retry wrapper for candle fetchers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{MarketDataError, RetryPolicy};
use crate::models::{Candle, Instrument, Resolution};
use crate::provider::{CandleFetcher, ProviderCapabilities};

/// Applies a [`RetryPolicy`] around another candle fetcher.
///
/// Each attempt goes through the inner fetcher, so every retry passes the
/// rate gate again. Only transport failures are retried.
pub struct RetryingCandleFetcher {
    inner: Arc<dyn CandleFetcher>,
    policy: RetryPolicy,
}

impl RetryingCandleFetcher {
    pub fn new(inner: Arc<dyn CandleFetcher>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CandleFetcher for RetryingCandleFetcher {
    fn provider(&self) -> &'static str {
        self.inner.provider()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }

    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.policy
            .run(|| self.inner.fetch_candles(instrument, resolution, count))
            .await
    }
}
