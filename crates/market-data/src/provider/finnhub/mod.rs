//! Finnhub market data provider.
//!
//! Secondary source, used for:
//! - Epoch-windowed candles via `/forex/candle` and `/crypto/candle`
//! - Market and company news via `/news` and `/company-news` (see [`news`])
//!
//! The API key travels in the `X-Finnhub-Token` header, never in the URL.
//! Free tier is limited to 60 calls per minute.

pub mod news;

pub use news::{FinnhubNewsFetcher, NewsArticle, NewsMode};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{AssetClass, Candle, Instrument, Resolution};
use crate::normalize;
use crate::provider::{
    pass_gate, CandleFetcher, FetchStrategy, ProviderCapabilities, ProviderSettings, RateLimit,
};
use crate::registry::RateGate;

pub const PROVIDER_ID: &str = "FINNHUB";
pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
pub const API_KEY_ENV: &str = "FINNHUB_API_KEY";

/// Free tier quota.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::per_minute(60);

/// Response from the `/forex/candle` and `/crypto/candle` endpoints.
///
/// Parallel arrays indexed by candle; `v` is often absent for forex.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandleResponse {
    /// Status: "ok" or "no_data"
    #[serde(default)]
    pub s: Option<String>,
    /// Timestamps (Unix seconds)
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<f64>,
    #[serde(default)]
    pub h: Vec<f64>,
    #[serde(default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub v: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Shared HTTP client for Finnhub fetchers.
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
    gate: Arc<RateGate>,
    gate_timeout: Option<Duration>,
}

impl FinnhubClient {
    /// Build a client and register its interval with `gate`.
    pub fn new(settings: &ProviderSettings, gate: Arc<RateGate>) -> Result<Self, MarketDataError> {
        settings.require_key(PROVIDER_ID, API_KEY_ENV)?;
        gate.configure(PROVIDER_ID, settings.rate_limit.min_interval());

        Ok(Self {
            client: settings.http_client(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            gate,
            gate_timeout: settings.gate_timeout,
        })
    }

    /// Gate, send and decode a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let url = format!("{}{}", self.base_url, endpoint);

        pass_gate(&self.gate, PROVIDER_ID, self.gate_timeout).await?;

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| MarketDataError::from_reqwest(PROVIDER_ID, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error)
                .unwrap_or(body);
            return Err(MarketDataError::transport(
                PROVIDER_ID,
                format!("HTTP {} - {}", status, message),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| MarketDataError::from_reqwest(PROVIDER_ID, e))?;

        serde_json::from_str(&text).map_err(|e| {
            MarketDataError::provider_error(PROVIDER_ID, format!("Failed to parse response: {}", e))
        })
    }
}

/// Provider symbol for an instrument: `OANDA:EUR_USD` or `BINANCE:BTCUSDT`.
pub fn legacy_symbol(instrument: &Instrument) -> String {
    match instrument.asset_class {
        AssetClass::Forex | AssetClass::PreciousMetal => {
            format!("OANDA:{}_{}", instrument.base, instrument.quote)
        }
        AssetClass::Crypto => format!("BINANCE:{}USDT", instrument.base),
    }
}

fn candle_endpoint(class: AssetClass) -> &'static str {
    match class {
        AssetClass::Forex | AssetClass::PreciousMetal => "/forex/candle",
        AssetClass::Crypto => "/crypto/candle",
    }
}

/// Epoch-windowed candles for every asset class.
pub struct LegacyCandleFetcher {
    client: Arc<FinnhubClient>,
}

impl LegacyCandleFetcher {
    pub fn new(client: Arc<FinnhubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandleFetcher for LegacyCandleFetcher {
    fn provider(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_classes: &[AssetClass::Forex, AssetClass::PreciousMetal, AssetClass::Crypto],
            strategy: FetchStrategy::LegacyCandle,
        }
    }

    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let to = Utc::now().timestamp();
        let from = to - resolution.window_secs(count);

        let symbol = legacy_symbol(instrument);
        let resolution_code = resolution.code();
        let from = from.to_string();
        let to = to.to_string();
        let params = [
            ("symbol", symbol.as_str()),
            ("resolution", resolution_code.as_str()),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];

        let response: CandleResponse = self
            .client
            .get(candle_endpoint(instrument.asset_class), &params)
            .await?;

        let status = response.s.as_deref().unwrap_or("missing");
        if status != "ok" {
            warn!("Finnhub candles for {}: status {}", symbol, status);
            return Err(MarketDataError::no_data(
                PROVIDER_ID,
                format!("Candle status '{}' for {}", status, symbol),
            ));
        }

        let candles = normalize::legacy_candles(&response, count);
        if candles.is_empty() {
            return Err(MarketDataError::no_data(
                PROVIDER_ID,
                format!("No usable candles for {}", symbol),
            ));
        }
        Ok(candles)
    }
}
