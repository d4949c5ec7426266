//! Runtime configuration for the market data core.
//!
//! Read once at startup from the process environment:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `ALPHAVANTAGE_API_KEY` | required | Primary provider key |
//! | `ALPHAVANTAGE_BASE_URL` | `https://www.alphavantage.co/query` | |
//! | `ALPHAVANTAGE_REQUESTS_PER_MINUTE` | `5` | Rate gate quota |
//! | `FINNHUB_API_KEY` | unset | Enables legacy candles and news |
//! | `FINNHUB_BASE_URL` | `https://finnhub.io/api/v1` | |
//! | `FINNHUB_REQUESTS_PER_MINUTE` | `60` | |
//! | `FXDESK_QUOTE_TTL_SECS` | `30` | Quote cache lifetime |
//! | `FXDESK_REQUEST_TIMEOUT_SECS` | `10` | Per HTTP exchange |
//! | `FXDESK_GATE_TIMEOUT_SECS` | `60` | Rate gate wait; `0` waits forever |

use std::time::Duration;

use log::warn;

use crate::errors::{MarketDataError, RetryPolicy};
use crate::provider::{alpha_vantage, finnhub, ProviderSettings, RateLimit};
use crate::registry::DEFAULT_QUOTE_TTL;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the whole acquisition core.
#[derive(Clone, Debug)]
pub struct MarketDataConfig {
    pub alpha_vantage: ProviderSettings,
    /// `None` when no Finnhub key is configured; the legacy candle source and
    /// news then answer with a configuration error.
    pub finnhub: Option<ProviderSettings>,
    pub quote_ttl: Duration,
    /// Backoff applied around legacy candle fetches. `None` disables retries.
    pub legacy_retry: Option<RetryPolicy>,
}

impl MarketDataConfig {
    /// Defaults with the given primary key.
    pub fn new(alpha_vantage_key: impl Into<String>) -> Self {
        Self {
            alpha_vantage: ProviderSettings::new(
                alpha_vantage_key,
                alpha_vantage::DEFAULT_BASE_URL,
                alpha_vantage::DEFAULT_RATE_LIMIT,
            ),
            finnhub: None,
            quote_ttl: DEFAULT_QUOTE_TTL,
            legacy_retry: None,
        }
    }

    /// Read configuration from environment variables.
    pub fn from_env() -> Result<Self, MarketDataError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MarketDataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let av_key = non_empty(alpha_vantage::API_KEY_ENV).ok_or_else(|| {
            MarketDataError::Configuration(format!(
                "{} environment variable not set",
                alpha_vantage::API_KEY_ENV
            ))
        })?;

        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "FXDESK_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs(),
        ));
        let gate_timeout = match parse_or(
            &lookup,
            "FXDESK_GATE_TIMEOUT_SECS",
            DEFAULT_GATE_TIMEOUT.as_secs(),
        ) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let alpha_vantage = ProviderSettings::new(
            av_key,
            non_empty("ALPHAVANTAGE_BASE_URL")
                .unwrap_or_else(|| alpha_vantage::DEFAULT_BASE_URL.to_string()),
            RateLimit::per_minute(parse_or(
                &lookup,
                "ALPHAVANTAGE_REQUESTS_PER_MINUTE",
                alpha_vantage::DEFAULT_RATE_LIMIT.requests_per_minute,
            )),
        )
        .with_request_timeout(request_timeout)
        .with_gate_timeout(gate_timeout);

        let finnhub = non_empty(finnhub::API_KEY_ENV).map(|key| {
            ProviderSettings::new(
                key,
                non_empty("FINNHUB_BASE_URL")
                    .unwrap_or_else(|| finnhub::DEFAULT_BASE_URL.to_string()),
                RateLimit::per_minute(parse_or(
                    &lookup,
                    "FINNHUB_REQUESTS_PER_MINUTE",
                    finnhub::DEFAULT_RATE_LIMIT.requests_per_minute,
                )),
            )
            .with_request_timeout(request_timeout)
            .with_gate_timeout(gate_timeout)
        });

        Ok(Self {
            alpha_vantage,
            finnhub,
            quote_ttl: Duration::from_secs(parse_or(
                &lookup,
                "FXDESK_QUOTE_TTL_SECS",
                DEFAULT_QUOTE_TTL.as_secs(),
            )),
            legacy_retry: None,
        })
    }

    pub fn with_finnhub(mut self, settings: ProviderSettings) -> Self {
        self.finnhub = Some(settings);
        self
    }

    pub fn with_quote_ttl(mut self, ttl: Duration) -> Self {
        self.quote_ttl = ttl;
        self
    }

    pub fn with_legacy_retry(mut self, policy: RetryPolicy) -> Self {
        self.legacy_retry = Some(policy);
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
