//! Fetcher capability traits.
//!
//! One implementation exists per (provider, data kind) pair. The aggregator
//! holds them as trait objects and picks one through [`FetchStrategy`].
//!
//! [`FetchStrategy`]: super::FetchStrategy

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{Candle, Instrument, Quote, Resolution};

use super::capabilities::ProviderCapabilities;
use super::finnhub::{NewsArticle, NewsMode};

/// Real-time quote capability.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use fxdesk_market_data::provider::QuoteFetcher;
///
/// struct FixedQuotes;
///
/// #[async_trait]
/// impl QuoteFetcher for FixedQuotes {
///     fn provider(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, MarketDataError> {
///         // ... build a Quote for `instrument`
///     }
/// }
/// ```
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Provider identifier, also the rate gate key.
    fn provider(&self) -> &'static str;

    /// Fetch and normalize the current quote for `instrument`.
    ///
    /// Returns `ProviderError`/`NoData` when the provider answered without
    /// usable data, and `Transport`/`Timeout` when it could not be reached.
    async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, MarketDataError>;
}

/// Candle series capability.
#[async_trait]
pub trait CandleFetcher: Send + Sync {
    fn provider(&self) -> &'static str;

    fn capabilities(&self) -> ProviderCapabilities;

    /// Fetch up to `count` candles, newest first.
    ///
    /// Entries missing a required field are dropped, never null-filled.
    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;
}

/// Market news capability.
#[async_trait]
pub trait NewsFetcher: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Up to `limit` articles, deduplicated by headline.
    async fn market_news(
        &self,
        limit: usize,
        mode: NewsMode,
    ) -> Result<Vec<NewsArticle>, MarketDataError>;

    /// Articles about one company over the last 30 days.
    async fn company_news(&self, symbol: &str) -> Result<Vec<NewsArticle>, MarketDataError>;
}
