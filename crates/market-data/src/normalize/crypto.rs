//! Digital-currency daily series.
//!
//! The upstream has shipped two layouts for the same endpoint:
//!
//! | Role   | Market-suffixed       | Plain       |
//! |--------|-----------------------|-------------|
//! | open   | `1a. open (USD)`      | `1. open`   |
//! | high   | `2a. high (USD)`      | `2. high`   |
//! | low    | `3a. low (USD)`       | `3. low`    |
//! | close  | `4a. close (USD)`     | `4. close`  |
//! | volume | `5. volume`           | `5. volume` |
//!
//! The layout is detected once per response from the newest entry. Entries the
//! detected table cannot resolve fall back to probing: the first key containing
//! the role name (and, for prices, the market code) wins.

use log::debug;
use serde_json::{Map, Value};

use super::{newest_first, parse_f64};
use crate::errors::MarketDataError;
use crate::models::Candle;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Role {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Role {
    const ALL: [Role; 5] = [Role::Open, Role::High, Role::Low, Role::Close, Role::Volume];

    fn name(self) -> &'static str {
        match self {
            Role::Open => "open",
            Role::High => "high",
            Role::Low => "low",
            Role::Close => "close",
            Role::Volume => "volume",
        }
    }

    fn is_price(self) -> bool {
        self != Role::Volume
    }
}

/// Known response layouts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseFormat {
    /// `1a. open (USD)` style keys, one column set per market.
    MarketSuffixed,
    /// `1. open` style keys.
    Plain,
}

/// Resolved field names for the five OHLCV roles.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CryptoFieldMap {
    format: ResponseFormat,
    /// Indexed like `Role::ALL`.
    keys: [String; 5],
}

impl CryptoFieldMap {
    pub fn new(format: ResponseFormat, market: &str) -> Self {
        let market = market.to_uppercase();
        let keys = match format {
            ResponseFormat::MarketSuffixed => [
                format!("1a. open ({})", market),
                format!("2a. high ({})", market),
                format!("3a. low ({})", market),
                format!("4a. close ({})", market),
                "5. volume".to_string(),
            ],
            ResponseFormat::Plain => [
                "1. open".to_string(),
                "2. high".to_string(),
                "3. low".to_string(),
                "4. close".to_string(),
                "5. volume".to_string(),
            ],
        };
        Self { format, keys }
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// First layout whose five keys are all present in `entry`.
    pub fn detect(entry: &Map<String, Value>, market: &str) -> Option<Self> {
        [ResponseFormat::MarketSuffixed, ResponseFormat::Plain]
            .into_iter()
            .map(|format| Self::new(format, market))
            .find(|map| map.keys.iter().all(|key| entry.contains_key(key)))
    }

    fn resolve(&self, entry: &Map<String, Value>) -> Option<[f64; 5]> {
        let mut values = [0.0; 5];
        for (slot, key) in values.iter_mut().zip(self.keys.iter()) {
            *slot = entry.get(key).and_then(parse_f64)?;
        }
        Some(values)
    }
}

/// Substring probe for one role. Price roles must also mention the market.
fn probe_role(entry: &Map<String, Value>, role: Role, market: &str) -> Option<f64> {
    let market = market.to_lowercase();
    entry
        .iter()
        .find(|(key, _)| {
            let key = key.to_lowercase();
            key.contains(role.name()) && (!role.is_price() || key.contains(&market))
        })
        .and_then(|(_, value)| parse_f64(value))
}

fn probe(entry: &Map<String, Value>, label: &str, market: &str) -> Result<[f64; 5], MarketDataError> {
    let mut values = [0.0; 5];
    for (slot, role) in values.iter_mut().zip(Role::ALL) {
        *slot = probe_role(entry, role, market).ok_or_else(|| MarketDataError::MalformedEntry {
            entry: label.to_string(),
            field: role.name().to_string(),
        })?;
    }
    Ok(values)
}

fn crypto_candle(
    label: &str,
    entry: &Value,
    table: Option<&CryptoFieldMap>,
    market: &str,
) -> Result<Candle, MarketDataError> {
    let entry = entry.as_object().ok_or_else(|| MarketDataError::MalformedEntry {
        entry: label.to_string(),
        field: "object".to_string(),
    })?;

    let values = match table.and_then(|t| t.resolve(entry)) {
        Some(values) => values,
        None => probe(entry, label, market)?,
    };
    let [open, high, low, close, volume] = values;

    Ok(Candle {
        time: label.to_string(),
        open,
        high,
        low,
        close,
        volume: Some(volume),
    })
}

/// Map a date-keyed digital-currency series onto at most `count` candles,
/// newest first. All five roles are required.
pub fn crypto_series(series: &Map<String, Value>, market: &str, count: usize) -> Vec<Candle> {
    let entries = newest_first(series);

    let table = entries
        .first()
        .and_then(|(_, entry)| entry.as_object())
        .and_then(|entry| CryptoFieldMap::detect(entry, market));
    match &table {
        Some(table) => debug!("Crypto series layout: {:?}", table.format()),
        None => debug!("Crypto series layout not recognized, probing keys"),
    }

    entries
        .into_iter()
        .filter_map(
            |(label, entry)| match crypto_candle(label, entry, table.as_ref(), market) {
                Ok(candle) => Some(candle),
                Err(e) => {
                    debug!("Dropping crypto entry: {}", e);
                    None
                }
            },
        )
        .take(count)
        .collect()
}
