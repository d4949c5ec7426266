//! Alpha Vantage market data provider.
//!
//! Primary source for every instrument class:
//! - Realtime rates via `CURRENCY_EXCHANGE_RATE` (forex, metals and crypto)
//! - FX candles via `FX_INTRADAY` / `FX_DAILY` / `FX_WEEKLY` / `FX_MONTHLY`
//! - Crypto candles via `DIGITAL_CURRENCY_DAILY`
//!
//! Note: the free tier allows 5 calls per minute. Every request passes the
//! shared [`RateGate`] before it is sent.

mod models;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::errors::MarketDataError;
use crate::models::{AssetClass, Candle, Instrument, Quote, Resolution};
use crate::normalize;
use crate::provider::{
    pass_gate, CandleFetcher, FetchStrategy, ProviderCapabilities, ProviderSettings, QuoteFetcher,
    RateLimit,
};
use crate::registry::RateGate;

use models::{
    envelope_message, output_size, FxSeriesRequest, CRYPTO_DAILY_KEY, CURRENCY_EXCHANGE_RATE,
    DIGITAL_CURRENCY_DAILY, EXCHANGE_RATE_KEY,
};

pub const PROVIDER_ID: &str = "ALPHA_VANTAGE";
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

/// Free tier quota.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::per_minute(5);

/// Shared HTTP client for all Alpha Vantage fetchers.
///
/// Holds the API key, the rate gate and the request deadline. Fetchers wrap
/// it in an `Arc` so the gate lane is shared between quote and candle calls.
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
    gate: Arc<RateGate>,
    gate_timeout: Option<Duration>,
}

impl AlphaVantageClient {
    /// Build a client and register its interval with `gate`.
    ///
    /// Fails with `Configuration` when the API key is empty.
    pub fn new(settings: &ProviderSettings, gate: Arc<RateGate>) -> Result<Self, MarketDataError> {
        settings.require_key(PROVIDER_ID, API_KEY_ENV)?;
        gate.configure(PROVIDER_ID, settings.rate_limit.min_interval());

        Ok(Self {
            client: settings.http_client(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone(),
            gate,
            gate_timeout: settings.gate_timeout,
        })
    }

    /// Gate, send and decode one query. Error envelopes become `ProviderError`.
    async fn query(&self, params: &[(&str, &str)]) -> Result<Value, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::Configuration(format!("Invalid Alpha Vantage URL: {}", e))
        })?;

        pass_gate(&self.gate, PROVIDER_ID, self.gate_timeout).await?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketDataError::from_reqwest(PROVIDER_ID, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::transport(
                PROVIDER_ID,
                format!("HTTP {}", status),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| MarketDataError::from_reqwest(PROVIDER_ID, e))?;

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            MarketDataError::provider_error(PROVIDER_ID, format!("Failed to parse response: {}", e))
        })?;

        if let Some(message) = envelope_message(&payload) {
            warn!("Alpha Vantage returned an error envelope: {}", message);
            return Err(MarketDataError::provider_error(PROVIDER_ID, message));
        }

        Ok(payload)
    }
}

/// Take ownership of a top-level object member, or report it as missing.
fn take_object(mut payload: Value, key: &str) -> Result<Map<String, Value>, MarketDataError> {
    match payload.get_mut(key).map(Value::take) {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(MarketDataError::no_data(
            PROVIDER_ID,
            format!("'{}' missing from response", key),
        )),
    }
}

fn non_empty(candles: Vec<Candle>, instrument: &Instrument) -> Result<Vec<Candle>, MarketDataError> {
    if candles.is_empty() {
        return Err(MarketDataError::no_data(
            PROVIDER_ID,
            format!("No usable candles for {}", instrument.symbol),
        ));
    }
    Ok(candles)
}

/// Realtime exchange rate for any catalog instrument.
pub struct ForexQuoteFetcher {
    client: Arc<AlphaVantageClient>,
}

impl ForexQuoteFetcher {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuoteFetcher for ForexQuoteFetcher {
    fn provider(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, MarketDataError> {
        let params = [
            ("function", CURRENCY_EXCHANGE_RATE),
            ("from_currency", instrument.base.as_str()),
            ("to_currency", instrument.quote.as_str()),
        ];

        let payload = self.client.query(&params).await?;
        let rate = take_object(payload, EXCHANGE_RATE_KEY)?;
        if rate.is_empty() {
            return Err(MarketDataError::no_data(
                PROVIDER_ID,
                format!("Empty exchange rate for {}", instrument.symbol),
            ));
        }
        Ok(normalize::fx_quote(instrument, &rate))
    }
}

/// Intraday and periodic FX series. Also serves metals.
pub struct ForexCandleFetcher {
    client: Arc<AlphaVantageClient>,
}

impl ForexCandleFetcher {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandleFetcher for ForexCandleFetcher {
    fn provider(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_classes: &[AssetClass::Forex, AssetClass::PreciousMetal],
            strategy: FetchStrategy::ForexCandle,
        }
    }

    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let request = FxSeriesRequest::for_resolution(resolution);

        let mut params = vec![
            ("function", request.function),
            ("from_symbol", instrument.base.as_str()),
            ("to_symbol", instrument.quote.as_str()),
            ("outputsize", output_size(count)),
        ];
        if let Some(interval) = request.interval.as_deref() {
            params.push(("interval", interval));
        }

        let payload = self.client.query(&params).await?;
        let series = take_object(payload, &request.series_key)?;
        non_empty(normalize::fx_series(&series, count), instrument)
    }
}

/// Daily digital-currency series. Resolution is ignored: only daily bars exist.
pub struct CryptoCandleFetcher {
    client: Arc<AlphaVantageClient>,
}

impl CryptoCandleFetcher {
    pub fn new(client: Arc<AlphaVantageClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandleFetcher for CryptoCandleFetcher {
    fn provider(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_classes: &[AssetClass::Crypto],
            strategy: FetchStrategy::CryptoCandle,
        }
    }

    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        if !matches!(resolution, Resolution::Period(code) if code == "D") {
            debug!(
                "Crypto candles are daily only; ignoring resolution {} for {}",
                resolution, instrument.symbol
            );
        }

        let params = [
            ("function", DIGITAL_CURRENCY_DAILY),
            ("symbol", instrument.base.as_str()),
            ("market", instrument.quote.as_str()),
            ("outputsize", output_size(count)),
        ];

        let payload = self.client.query(&params).await?;
        let series = take_object(payload, CRYPTO_DAILY_KEY)?;
        non_empty(
            normalize::crypto_series(&series, &instrument.quote, count),
            instrument,
        )
    }
}
