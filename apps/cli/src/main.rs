mod main_lib;

use anyhow::bail;
use clap::{Parser, Subcommand};
use fxdesk_market_data::{CandleSource, NewsMode, Resolution};
use main_lib::{build_aggregator, init_tracing};
use serde::Serialize;

/// Forex, metals and crypto market data from the command line.
#[derive(Debug, Parser)]
#[command(name = "fxdesk", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the supported instruments
    Pairs,

    /// Real-time quotes (all supported pairs when none are given)
    Quotes {
        /// Symbols such as EURUSD or eur/usd
        symbols: Vec<String>,
    },

    /// Historical candles, newest first
    Candles {
        symbol: String,

        /// Minutes per candle, or D / W / M
        #[arg(short, long, default_value = "5")]
        resolution: String,

        /// Number of candles (1-1000)
        #[arg(short, long, default_value_t = 100)]
        count: usize,

        /// Use the legacy provider (requires FINNHUB_API_KEY)
        #[arg(long)]
        legacy: bool,
    },

    /// Market news, or company news with --company
    News {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Only top up with trading-relevant general headlines
        #[arg(long)]
        trading: bool,

        #[arg(long)]
        company: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let aggregator = build_aggregator()?;

    match cli.command {
        Command::Pairs => print_json(&aggregator.supported_pairs())?,

        Command::Quotes { symbols } => {
            let batch = if symbols.is_empty() {
                aggregator.get_quotes::<String>(None).await
            } else {
                aggregator.get_quotes(Some(symbols.as_slice())).await
            };
            print_json(&batch)?;
            if batch.is_empty() {
                bail!("No quotes available");
            }
        }

        Command::Candles {
            symbol,
            resolution,
            count,
            legacy,
        } => {
            let source = if legacy {
                CandleSource::Legacy
            } else {
                CandleSource::Primary
            };
            let resolution = Resolution::parse(&resolution);
            let candles = aggregator
                .get_candles_from(source, &symbol, &resolution, count)
                .await?;
            tracing::info!("{} candles for {}", candles.len(), symbol);
            print_json(&candles)?;
        }

        Command::News {
            limit,
            trading,
            company,
        } => {
            let articles = match company {
                Some(symbol) => aggregator.company_news(&symbol).await?,
                None => {
                    let mode = if trading {
                        NewsMode::TradingFiltered
                    } else {
                        NewsMode::Combined
                    };
                    aggregator.market_news(limit, mode).await?
                }
            };
            print_json(&articles)?;
        }
    }

    Ok(())
}
