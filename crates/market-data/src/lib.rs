//! FxDesk Market Data Crate
//!
//! Market-data acquisition core for a forex trading dashboard: real-time
//! quotes and historical candles for a fixed catalog of currency pairs,
//! precious metals and crypto pairs.
//!
//! # Overview
//!
//! The crate provides:
//! - A static instrument catalog (symbol, pip size, lot size, asset class)
//! - A per-provider rate gate for quota-limited upstreams
//! - A short-lived quote cache
//! - Provider fetchers (Alpha Vantage, Finnhub) behind capability traits
//! - A pure normalizer from raw payloads to canonical records
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |    Aggregator    |  get_quotes / get_candles / news
//! +------------------+
//!     |          |
//!     v          v
//! +---------+  +------------+
//! | Catalog |  | QuoteCache |  (resolve symbol, serve fresh quotes)
//! +---------+  +------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |  Fetcher (trait) | --> |     RateGate     |  (min interval per provider)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |    Normalizer    |  (raw payload -> Quote / Candle)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Instrument`] - Catalog entry with pip and lot metadata
//! - [`Quote`] - Normalized real-time quote
//! - [`Candle`] - Normalized OHLCV record
//! - [`Resolution`] - Requested candle granularity
//! - [`Aggregator`] - Orchestrates catalog, cache, gate and fetchers
//! - [`MarketDataConfig`] - Keys, quotas and timeouts read from the environment

pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod registry;

// Re-export all public types from models
pub use models::{AssetClass, Candle, Instrument, Quote, Resolution};

pub use catalog::{normalize_symbol, InstrumentCatalog};
pub use config::MarketDataConfig;
pub use errors::{MarketDataError, RetryClass, RetryPolicy};

// Re-export provider types
pub use provider::alpha_vantage::{
    AlphaVantageClient, CryptoCandleFetcher, ForexCandleFetcher, ForexQuoteFetcher,
};
pub use provider::finnhub::{
    FinnhubClient, FinnhubNewsFetcher, LegacyCandleFetcher, NewsArticle, NewsMode,
};
pub use provider::{
    CandleFetcher, FetchStrategy, NewsFetcher, ProviderCapabilities, ProviderSettings,
    QuoteFetcher, RateLimit, RetryingCandleFetcher,
};

// Re-export registry types
pub use registry::{Aggregator, CandleSource, Fetchers, QuoteBatch, QuoteCache, RateGate};
