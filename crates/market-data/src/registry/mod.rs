//! Request-side building blocks shared by every fetcher.
//!
//! - [`RateGate`]: per-provider minimum spacing between calls
//! - [`QuoteCache`]: short-lived quote cache keyed by symbol
//! - [`Aggregator`]: orchestration over catalog, cache, gate and fetchers

mod aggregator;
mod quote_cache;
mod rate_gate;

pub use aggregator::{Aggregator, CandleSource, Fetchers, QuoteBatch, MAX_CANDLES, MIN_CANDLES};
pub use quote_cache::{QuoteCache, DEFAULT_QUOTE_TTL};
pub use rate_gate::RateGate;
