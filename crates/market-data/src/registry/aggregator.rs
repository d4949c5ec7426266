//! Request orchestration over the catalog, cache and fetchers.
//!
//! The aggregator is the only entry point callers need:
//! 1. Resolve the symbol against the catalog (unknown symbols are rejected)
//! 2. For quotes, serve from the cache while fresh
//! 3. Pick a fetcher by asset class and candle source
//! 4. Fetch (the provider client passes the rate gate first)
//! 5. Write quotes through to the cache
//!
//! Provider failures never escape as errors: they are logged and the symbol
//! is reported as unavailable, or the candle list comes back empty. Only
//! configuration problems and unsupported symbols are hard errors.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use super::{QuoteCache, RateGate};
use crate::catalog::{normalize_symbol, InstrumentCatalog};
use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{Candle, Instrument, Quote, Resolution};
use crate::provider::alpha_vantage::{
    AlphaVantageClient, CryptoCandleFetcher, ForexCandleFetcher, ForexQuoteFetcher,
};
use crate::provider::finnhub::{
    FinnhubClient, FinnhubNewsFetcher, LegacyCandleFetcher, NewsArticle, NewsMode,
};
use crate::provider::{
    CandleFetcher, FetchStrategy, NewsFetcher, QuoteFetcher, RetryingCandleFetcher,
};

/// Smallest and largest candle count a request may ask for.
pub const MIN_CANDLES: usize = 1;
pub const MAX_CANDLES: usize = 1000;

/// Which provider family serves a candle request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CandleSource {
    #[default]
    Primary,
    Legacy,
}

/// Outcome of a batch quote request.
///
/// Symbols are reported in normalized form.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBatch {
    pub quotes: BTreeMap<String, Quote>,
    /// Not in the catalog.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<String>,
    /// Supported, but the provider had nothing usable or could not be reached.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<String>,
}

impl QuoteBatch {
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// The fetchers an aggregator dispatches to.
#[derive(Clone)]
pub struct Fetchers {
    pub quotes: Arc<dyn QuoteFetcher>,
    pub forex_candles: Arc<dyn CandleFetcher>,
    pub crypto_candles: Arc<dyn CandleFetcher>,
    /// Present only when the legacy provider is configured.
    pub legacy_candles: Option<Arc<dyn CandleFetcher>>,
    pub news: Option<Arc<dyn NewsFetcher>>,
}

impl Fetchers {
    /// Build the provider clients, registering their intervals with `gate`.
    pub fn from_config(
        config: &MarketDataConfig,
        gate: &Arc<RateGate>,
    ) -> Result<Self, MarketDataError> {
        let primary = Arc::new(AlphaVantageClient::new(
            &config.alpha_vantage,
            Arc::clone(gate),
        )?);

        let legacy = match &config.finnhub {
            Some(settings) => Some(Arc::new(FinnhubClient::new(settings, Arc::clone(gate))?)),
            None => {
                info!("No Finnhub key configured; legacy candles and news disabled");
                None
            }
        };

        let legacy_candles = legacy.as_ref().map(|client| {
            let fetcher: Arc<dyn CandleFetcher> =
                Arc::new(LegacyCandleFetcher::new(Arc::clone(client)));
            match &config.legacy_retry {
                Some(policy) => Arc::new(RetryingCandleFetcher::new(fetcher, policy.clone()))
                    as Arc<dyn CandleFetcher>,
                None => fetcher,
            }
        });
        let news = legacy.map(|client| Arc::new(FinnhubNewsFetcher::new(client)) as Arc<dyn NewsFetcher>);

        Ok(Self {
            quotes: Arc::new(ForexQuoteFetcher::new(Arc::clone(&primary))),
            forex_candles: Arc::new(ForexCandleFetcher::new(Arc::clone(&primary))),
            crypto_candles: Arc::new(CryptoCandleFetcher::new(primary)),
            legacy_candles,
            news,
        })
    }
}

/// Market data facade over the catalog, cache, gate and fetchers.
pub struct Aggregator {
    catalog: Arc<InstrumentCatalog>,
    cache: Arc<QuoteCache>,
    gate: Arc<RateGate>,
    fetchers: Fetchers,
}

impl Aggregator {
    pub fn new(
        catalog: Arc<InstrumentCatalog>,
        cache: Arc<QuoteCache>,
        gate: Arc<RateGate>,
        fetchers: Fetchers,
    ) -> Self {
        Self {
            catalog,
            cache,
            gate,
            fetchers,
        }
    }

    /// Wire the builtin catalog to real provider clients.
    ///
    /// Fails when the primary API key is missing.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        let gate = Arc::new(RateGate::default());
        let fetchers = Fetchers::from_config(config, &gate)?;
        Ok(Self::new(
            InstrumentCatalog::builtin(),
            Arc::new(QuoteCache::new(config.quote_ttl)),
            gate,
            fetchers,
        ))
    }

    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Catalog metadata keyed by symbol.
    pub fn supported_pairs(&self) -> BTreeMap<&str, &Instrument> {
        self.catalog.supported_pairs()
    }

    /// Quote for one symbol, from cache when fresh.
    ///
    /// Unlike [`get_quotes`](Self::get_quotes), provider failures are returned.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let instrument = self.catalog.resolve(symbol)?;

        if let Some(quote) = self.cache.get(&instrument.symbol) {
            debug!("Quote cache hit for {}", instrument.symbol);
            return Ok(quote);
        }

        let quote = self.fetchers.quotes.fetch_quote(instrument).await?;
        self.cache.put(&instrument.symbol, quote.clone());
        Ok(quote)
    }

    /// Quotes for `symbols`, or the whole catalog when `None`.
    ///
    /// Symbols are processed one after another in request order: concurrent
    /// dispatch would only queue on the rate gate and risk its deadline.
    /// Unsupported and unavailable symbols are omitted from `quotes` and
    /// listed separately.
    pub async fn get_quotes<S: AsRef<str>>(&self, symbols: Option<&[S]>) -> QuoteBatch {
        let requested: Vec<String> = match symbols {
            Some(symbols) => {
                let mut seen = HashSet::new();
                symbols
                    .iter()
                    .map(|s| normalize_symbol(s.as_ref()))
                    .filter(|s| seen.insert(s.clone()))
                    .collect()
            }
            None => self
                .catalog
                .list()
                .iter()
                .map(|i| i.symbol.clone())
                .collect(),
        };

        let mut batch = QuoteBatch::default();
        for symbol in requested {
            match self.get_quote(&symbol).await {
                Ok(quote) => {
                    batch.quotes.insert(symbol, quote);
                }
                Err(MarketDataError::UnsupportedSymbol(_)) => {
                    warn!("Unsupported currency pair: {}", symbol);
                    batch.unsupported.push(symbol);
                }
                Err(e) => {
                    warn!("Quote for {} unavailable: {}", symbol, e);
                    batch.unavailable.push(symbol);
                }
            }
        }

        debug!(
            "Quote batch: {} ok, {} unsupported, {} unavailable",
            batch.quotes.len(),
            batch.unsupported.len(),
            batch.unavailable.len()
        );
        batch
    }

    /// Candles from the primary provider.
    pub async fn get_candles(
        &self,
        symbol: &str,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.get_candles_from(CandleSource::Primary, symbol, resolution, count)
            .await
    }

    /// Up to `count` candles (clamped to 1..=1000), newest first.
    ///
    /// Returns `Err` only for unsupported symbols and missing configuration;
    /// provider failures yield an empty list.
    pub async fn get_candles_from(
        &self,
        source: CandleSource,
        symbol: &str,
        resolution: &Resolution,
        count: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let instrument = self.catalog.resolve(symbol)?;
        let count = count.clamp(MIN_CANDLES, MAX_CANDLES);
        let fetcher = self.candle_fetcher(source, instrument)?;

        debug!(
            "Fetching {} {} candles for {} from {}",
            count,
            resolution,
            instrument.symbol,
            fetcher.provider()
        );

        match fetcher.fetch_candles(instrument, resolution, count).await {
            Ok(candles) => Ok(candles),
            Err(e @ MarketDataError::Configuration(_)) => Err(e),
            Err(e) => {
                warn!("Candles for {} unavailable: {}", instrument.symbol, e);
                Ok(Vec::new())
            }
        }
    }

    fn candle_fetcher(
        &self,
        source: CandleSource,
        instrument: &Instrument,
    ) -> Result<&Arc<dyn CandleFetcher>, MarketDataError> {
        let strategy = match source {
            CandleSource::Primary => FetchStrategy::primary_candles(instrument.asset_class),
            CandleSource::Legacy => FetchStrategy::LegacyCandle,
        };

        let fetcher = match strategy {
            FetchStrategy::ForexCandle => &self.fetchers.forex_candles,
            FetchStrategy::CryptoCandle => &self.fetchers.crypto_candles,
            FetchStrategy::LegacyCandle => self.fetchers.legacy_candles.as_ref().ok_or_else(|| {
                MarketDataError::Configuration(
                    "Legacy candle source requires FINNHUB_API_KEY".to_string(),
                )
            })?,
            FetchStrategy::ForexQuote => {
                return Err(MarketDataError::Configuration(
                    "Quote strategy cannot serve candles".to_string(),
                ))
            }
        };

        if !fetcher.capabilities().supports(instrument.asset_class) {
            return Err(MarketDataError::Configuration(format!(
                "{} cannot serve {} candles",
                fetcher.provider(),
                instrument.asset_class
            )));
        }
        Ok(fetcher)
    }

    fn news_fetcher(&self) -> Result<&Arc<dyn NewsFetcher>, MarketDataError> {
        self.fetchers.news.as_ref().ok_or_else(|| {
            MarketDataError::Configuration("News requires FINNHUB_API_KEY".to_string())
        })
    }

    /// Latest market news. Provider failures yield an empty list.
    pub async fn market_news(
        &self,
        limit: usize,
        mode: NewsMode,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        let fetcher = self.news_fetcher()?;
        match fetcher.market_news(limit, mode).await {
            Ok(articles) => Ok(articles),
            Err(e) => {
                warn!("Market news unavailable: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Company news for the last 30 days. Provider failures yield an empty list.
    pub async fn company_news(&self, symbol: &str) -> Result<Vec<NewsArticle>, MarketDataError> {
        let fetcher = self.news_fetcher()?;
        match fetcher.company_news(symbol).await {
            Ok(articles) => Ok(articles),
            Err(e) => {
                warn!("Company news for {} unavailable: {}", symbol, e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetClass;
    use crate::provider::ProviderCapabilities;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    // ------------------------------------------------------------------
    // Mock fetchers
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockQuotes {
        calls: AtomicUsize,
        /// Symbols answered with a no-data error.
        empty: Vec<&'static str>,
    }

    #[async_trait]
    impl QuoteFetcher for MockQuotes {
        fn provider(&self) -> &'static str {
            "MOCK"
        }

        async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.empty.iter().any(|s| *s == instrument.symbol) {
                return Err(MarketDataError::provider_error("MOCK", "Note: call frequency"));
            }
            Ok(Quote {
                symbol: instrument.symbol.clone(),
                price: 1.25,
                change: 0.0,
                change_pct: 0.0,
                high: 1.25,
                low: 1.25,
                open: 1.25,
                previous_close: 1.25,
                timestamp: "2024-01-15 16:00:00".to_string(),
                volume: None,
                bid: None,
                ask: None,
                spread: None,
                pip_value: instrument.pip_value(),
                pip_decimal_places: instrument.pip_decimal_places,
                asset_class: instrument.asset_class,
            })
        }
    }

    enum Outcome {
        Candles,
        NoData,
        Transport,
    }

    struct MockCandles {
        strategy: FetchStrategy,
        classes: &'static [AssetClass],
        outcome: Outcome,
        calls: AtomicUsize,
        last_count: AtomicUsize,
        last_symbol: Mutex<Option<String>>,
    }

    impl MockCandles {
        fn new(strategy: FetchStrategy, classes: &'static [AssetClass], outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                strategy,
                classes,
                outcome,
                calls: AtomicUsize::new(0),
                last_count: AtomicUsize::new(0),
                last_symbol: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CandleFetcher for MockCandles {
        fn provider(&self) -> &'static str {
            "MOCK"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                asset_classes: self.classes,
                strategy: self.strategy,
            }
        }

        async fn fetch_candles(
            &self,
            instrument: &Instrument,
            _resolution: &Resolution,
            count: usize,
        ) -> Result<Vec<Candle>, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_count.store(count, Ordering::SeqCst);
            *self.last_symbol.lock().unwrap() = Some(instrument.symbol.clone());

            match self.outcome {
                Outcome::Candles => Ok((0..count)
                    .map(|i| Candle {
                        time: format!("2024-01-15 {:02}:00:00", 23 - (i % 24)),
                        open: 1.0,
                        high: 1.1,
                        low: 0.9,
                        close: 1.05,
                        volume: None,
                    })
                    .collect()),
                Outcome::NoData => Err(MarketDataError::no_data("MOCK", "status no_data")),
                Outcome::Transport => Err(MarketDataError::transport("MOCK", "HTTP 503")),
            }
        }
    }

    const FX: &[AssetClass] = &[AssetClass::Forex, AssetClass::PreciousMetal];
    const CRYPTO: &[AssetClass] = &[AssetClass::Crypto];
    const ALL: &[AssetClass] = &[AssetClass::Forex, AssetClass::PreciousMetal, AssetClass::Crypto];

    struct Harness {
        aggregator: Aggregator,
        quotes: Arc<MockQuotes>,
        forex: Arc<MockCandles>,
        crypto: Arc<MockCandles>,
    }

    fn harness_with(quotes: MockQuotes, forex_outcome: Outcome, legacy: Option<Arc<MockCandles>>) -> Harness {
        let quotes = Arc::new(quotes);
        let forex = MockCandles::new(FetchStrategy::ForexCandle, FX, forex_outcome);
        let crypto = MockCandles::new(FetchStrategy::CryptoCandle, CRYPTO, Outcome::Candles);

        let fetchers = Fetchers {
            quotes: quotes.clone(),
            forex_candles: forex.clone(),
            crypto_candles: crypto.clone(),
            legacy_candles: legacy.map(|l| l as Arc<dyn CandleFetcher>),
            news: None,
        };

        Harness {
            aggregator: Aggregator::new(
                InstrumentCatalog::builtin(),
                Arc::new(QuoteCache::default()),
                Arc::new(RateGate::default()),
                fetchers,
            ),
            quotes,
            forex,
            crypto,
        }
    }

    fn harness() -> Harness {
        harness_with(MockQuotes::default(), Outcome::Candles, None)
    }

    // ------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_batch_skips_unsupported_symbols() {
        let h = harness();
        let batch = h
            .aggregator
            .get_quotes(Some(&["EURUSD", "ZZZNOPE"][..]))
            .await;

        assert_eq!(batch.len(), 1);
        assert!(batch.get("EURUSD").is_some());
        assert!(batch.get("ZZZNOPE").is_none());
        assert_eq!(batch.unsupported, vec!["ZZZNOPE".to_string()]);
        assert!(batch.unavailable.is_empty());
        assert_eq!(h.quotes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_without_symbols_covers_catalog() {
        let h = harness();
        let batch = h.aggregator.get_quotes::<&str>(None).await;
        assert_eq!(batch.len(), h.aggregator.catalog().len());
        assert_eq!(batch.get("usd/jpy").unwrap().pip_value, 0.01);
    }

    #[tokio::test]
    async fn test_batch_deduplicates_normalized_symbols() {
        let h = harness();
        let batch = h
            .aggregator
            .get_quotes(Some(&["eur/usd", "EURUSD", " EURUSD "][..]))
            .await;
        assert_eq!(batch.len(), 1);
        assert_eq!(h.quotes.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quotes_served_from_cache_until_ttl() {
        let h = harness();
        let symbols = ["EURUSD"];

        h.aggregator.get_quotes(Some(&symbols[..])).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        h.aggregator.get_quotes(Some(&symbols[..])).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        h.aggregator.get_quotes(Some(&symbols[..])).await;
        assert_eq!(h.quotes.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        h.aggregator.get_quotes(Some(&symbols[..])).await;
        assert_eq!(h.quotes.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_data_quote_is_unavailable_and_not_cached() {
        let quotes = MockQuotes {
            empty: vec!["GBPUSD"],
            ..Default::default()
        };
        let h = harness_with(quotes, Outcome::Candles, None);

        let batch = h
            .aggregator
            .get_quotes(Some(&["EURUSD", "GBPUSD"][..]))
            .await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.unavailable, vec!["GBPUSD".to_string()]);
        assert!(h.aggregator.cache().get("GBPUSD").is_none());
        assert!(h.aggregator.cache().get("EURUSD").is_some());
    }

    #[tokio::test]
    async fn test_single_quote_reports_errors() {
        let h = harness();
        assert!(matches!(
            h.aggregator.get_quote("ZZZNOPE").await,
            Err(MarketDataError::UnsupportedSymbol(_))
        ));
        assert_eq!(h.aggregator.get_quote("gbp/usd").await.unwrap().symbol, "GBPUSD");
    }

    // ------------------------------------------------------------------
    // Candles
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_candle_count_is_clamped() {
        let h = harness();
        let resolution = Resolution::Minutes(5);

        let candles = h.aggregator.get_candles("EURUSD", &resolution, 0).await.unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(h.forex.last_count.load(Ordering::SeqCst), 1);

        h.aggregator.get_candles("EURUSD", &resolution, 5000).await.unwrap();
        assert_eq!(h.forex.last_count.load(Ordering::SeqCst), MAX_CANDLES);
    }

    #[tokio::test]
    async fn test_unsupported_symbol_is_an_error() {
        let h = harness();
        let result = h
            .aggregator
            .get_candles("ZZZNOPE", &Resolution::Minutes(5), 50)
            .await;
        assert!(matches!(result, Err(MarketDataError::UnsupportedSymbol(_))));
        assert_eq!(h.forex.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_routing_by_asset_class() {
        let h = harness();
        let daily = Resolution::parse("D");

        h.aggregator.get_candles("BTCUSD", &daily, 10).await.unwrap();
        assert_eq!(h.crypto.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.crypto.last_symbol.lock().unwrap().as_deref(), Some("BTCUSD"));

        h.aggregator.get_candles("xau/usd", &daily, 10).await.unwrap();
        assert_eq!(h.forex.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.forex.last_symbol.lock().unwrap().as_deref(), Some("XAUUSD"));
    }

    #[tokio::test]
    async fn test_no_data_yields_empty_list() {
        let h = harness_with(MockQuotes::default(), Outcome::NoData, None);
        let candles = h
            .aggregator
            .get_candles("EURUSD", &Resolution::Minutes(5), 50)
            .await
            .unwrap();
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_yields_empty_list() {
        let h = harness_with(MockQuotes::default(), Outcome::Transport, None);
        let candles = h
            .aggregator
            .get_candles("GBPUSD", &Resolution::Minutes(15), 50)
            .await
            .unwrap();
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_source_requires_configuration() {
        let h = harness();
        let result = h
            .aggregator
            .get_candles_from(CandleSource::Legacy, "EURUSD", &Resolution::Minutes(5), 10)
            .await;
        assert!(matches!(result, Err(MarketDataError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_legacy_source_serves_every_class() {
        let legacy = MockCandles::new(FetchStrategy::LegacyCandle, ALL, Outcome::Candles);
        let h = harness_with(MockQuotes::default(), Outcome::Candles, Some(legacy.clone()));

        for symbol in ["EURUSD", "XAGUSD", "ETHUSD"] {
            let candles = h
                .aggregator
                .get_candles_from(CandleSource::Legacy, symbol, &Resolution::Minutes(5), 3)
                .await
                .unwrap();
            assert_eq!(candles.len(), 3);
        }
        assert_eq!(legacy.calls.load(Ordering::SeqCst), 3);
        assert_eq!(h.forex.calls.load(Ordering::SeqCst), 0);
    }

    // ------------------------------------------------------------------
    // News and wiring
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_news_requires_configuration() {
        let h = harness();
        assert!(matches!(
            h.aggregator.market_news(10, NewsMode::Combined).await,
            Err(MarketDataError::Configuration(_))
        ));
        assert!(matches!(
            h.aggregator.company_news("AAPL").await,
            Err(MarketDataError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_config_without_legacy_provider() {
        let aggregator = Aggregator::from_config(&MarketDataConfig::new("demo")).unwrap();
        assert_eq!(aggregator.supported_pairs().len(), 11);
        assert_eq!(
            aggregator.gate().min_interval("ALPHA_VANTAGE"),
            Duration::from_secs(12)
        );
        assert_eq!(aggregator.cache().ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_config_without_primary_key() {
        assert!(matches!(
            Aggregator::from_config(&MarketDataConfig::new("")),
            Err(MarketDataError::Configuration(_))
        ));
    }
}
