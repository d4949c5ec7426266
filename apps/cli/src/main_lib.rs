use anyhow::Context;
use fxdesk_market_data::{Aggregator, MarketDataConfig, RetryPolicy};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `FXDESK_LOG_FORMAT=json` switches to JSON lines.
///
/// Logs go to stderr so stdout stays valid JSON.
pub fn init_tracing() {
    let log_format = std::env::var("FXDESK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Read the environment and wire the aggregator.
///
/// Legacy candle fetches are retried with the default backoff.
pub fn build_aggregator() -> anyhow::Result<Aggregator> {
    let config = MarketDataConfig::from_env()
        .context("Market data configuration")?
        .with_legacy_retry(RetryPolicy::default());

    if config.finnhub.is_none() {
        tracing::info!("FINNHUB_API_KEY not set; legacy candles and news are disabled");
    }
    tracing::info!(
        "Quote cache TTL {:?}, Alpha Vantage quota {}/min",
        config.quote_ttl,
        config.alpha_vantage.rate_limit.requests_per_minute
    );

    Ok(Aggregator::from_config(&config)?)
}
