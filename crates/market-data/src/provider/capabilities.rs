//! Provider capabilities, fetch strategies and rate limiting configuration.

use std::time::Duration;

use crate::models::AssetClass;

/// The closed set of fetch strategies the aggregator can dispatch to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FetchStrategy {
    /// Real-time exchange rate (any asset class)
    ForexQuote,
    /// Intraday / periodic FX series (forex and metals)
    ForexCandle,
    /// Daily digital-currency series
    CryptoCandle,
    /// Epoch-windowed candles from the legacy provider
    LegacyCandle,
}

impl FetchStrategy {
    /// Primary-provider candle strategy for an asset class.
    ///
    /// Metals are forex-shaped for candle purposes.
    pub fn primary_candles(class: AssetClass) -> Self {
        match class {
            AssetClass::Forex | AssetClass::PreciousMetal => Self::ForexCandle,
            AssetClass::Crypto => Self::CryptoCandle,
        }
    }
}

/// Describes what a fetcher can do.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Asset classes this fetcher accepts.
    pub asset_classes: &'static [AssetClass],

    /// Strategy this fetcher implements.
    pub strategy: FetchStrategy,
}

impl ProviderCapabilities {
    pub fn supports(&self, class: AssetClass) -> bool {
        self.asset_classes.contains(&class)
    }
}

/// Rate limiting configuration for a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,
}

impl RateLimit {
    pub const fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
        }
    }

    /// Minimum spacing between dispatches: `60s / requests_per_minute`.
    pub fn min_interval(&self) -> Duration {
        if self.requests_per_minute == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(60) / self.requests_per_minute
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(60)
    }
}
