//! Provider fetchers and their shared plumbing.
//!
//! - [`traits`]: the `QuoteFetcher` / `CandleFetcher` / `NewsFetcher` capabilities
//! - [`capabilities`]: fetch strategies and rate limits
//! - [`alpha_vantage`]: primary provider (quotes, FX and crypto candles)
//! - [`finnhub`]: legacy candle provider and market news
//! - [`retrying`]: opt-in backoff wrapper for candle fetchers

pub mod alpha_vantage;
pub mod capabilities;
pub mod finnhub;
pub mod retrying;
pub mod traits;

pub use capabilities::{FetchStrategy, ProviderCapabilities, RateLimit};
pub use retrying::RetryingCandleFetcher;
pub use traits::{CandleFetcher, NewsFetcher, QuoteFetcher};

use std::time::Duration;

use reqwest::Client;

use crate::config::{DEFAULT_GATE_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
use crate::errors::MarketDataError;
use crate::registry::RateGate;

/// Connection settings for one provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub rate_limit: RateLimit,
    /// Deadline for a single HTTP exchange.
    pub request_timeout: Duration,
    /// Deadline for the rate gate wait. `None` waits indefinitely.
    pub gate_timeout: Option<Duration>,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, rate_limit: RateLimit) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            rate_limit,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            gate_timeout: Some(DEFAULT_GATE_TIMEOUT),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_gate_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.gate_timeout = timeout;
        self
    }

    pub(crate) fn require_key(&self, provider: &str, env_var: &str) -> Result<(), MarketDataError> {
        if self.api_key.trim().is_empty() {
            return Err(MarketDataError::Configuration(format!(
                "{} API key missing (set {})",
                provider, env_var
            )));
        }
        Ok(())
    }

    pub(crate) fn http_client(&self) -> Client {
        Client::builder()
            .timeout(self.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new())
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .field("request_timeout", &self.request_timeout)
            .field("gate_timeout", &self.gate_timeout)
            .finish()
    }
}

/// Pass the provider's rate gate, bounded by `timeout` when set.
pub(crate) async fn pass_gate(
    gate: &RateGate,
    provider: &str,
    timeout: Option<Duration>,
) -> Result<(), MarketDataError> {
    match timeout {
        Some(timeout) => gate.acquire_timeout(provider, timeout).await,
        None => {
            gate.acquire(provider).await;
            Ok(())
        }
    }
}
