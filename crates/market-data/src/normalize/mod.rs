//! Pure mapping from raw provider payloads to canonical records.
//!
//! Nothing in here performs I/O. Every function is deterministic: the same
//! payload always produces the same output, so normalizing twice is a no-op
//! in effect.
//!
//! Malformed records are dropped (and logged at debug level), never null-filled.
//! Series are emitted newest first and truncated to the requested count after
//! malformed entries have been filtered out.

mod crypto;

pub use crypto::{crypto_series, CryptoFieldMap, ResponseFormat};

use chrono::{TimeZone, Utc};
use log::debug;
use serde_json::{Map, Value};

use crate::errors::MarketDataError;
use crate::models::{Candle, Instrument, Quote};
use crate::provider::finnhub::CandleResponse;

/// Field names of the exchange-rate payload.
mod rate_keys {
    pub const PRICE: &str = "5. Exchange Rate";
    pub const LAST_REFRESHED: &str = "6. Last Refreshed";
    pub const PREVIOUS_CLOSE: &str = "8. Previous Close";
    pub const CHANGE: &str = "9. Change";
    pub const VOLUME: &str = "10. Volume";
    pub const BID: &str = "8. Bid Price";
    pub const ASK: &str = "9. Ask Price";
}

/// Field names of an FX series entry.
mod fx_keys {
    pub const OPEN: &str = "1. open";
    pub const HIGH: &str = "2. high";
    pub const LOW: &str = "3. low";
    pub const CLOSE: &str = "4. close";
    pub const VOLUME: &str = "5. volume";
}

/// Parse a JSON number or numeric string. Non-finite values are rejected.
pub(crate) fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Lenient numeric coercion: absent or unparseable values become `0.0`.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    value.and_then(parse_f64).unwrap_or(0.0)
}

fn positive(value: Option<&Value>) -> Option<f64> {
    value.and_then(parse_f64).filter(|v| *v > 0.0)
}

/// Map a realtime exchange-rate object onto a [`Quote`].
///
/// - `previous_close` falls back to the price when the upstream omits it
/// - `change_pct` is 0 when `previous_close` is 0
/// - `high`/`low` are `price ± change` as reported upstream
/// - `bid`/`ask` are present only when they parse to a positive number,
///   and `spread` only when both are
pub fn fx_quote(instrument: &Instrument, rate: &Map<String, Value>) -> Quote {
    let price = coerce_f64(rate.get(rate_keys::PRICE));
    let previous_close = rate
        .get(rate_keys::PREVIOUS_CLOSE)
        .map(|v| coerce_f64(Some(v)))
        .unwrap_or(price);

    let change = price - previous_close;
    let change_pct = if previous_close != 0.0 {
        change / previous_close * 100.0
    } else {
        0.0
    };

    // Approximation: upstream has no high/low fields here, so the range is
    // price +/- the reported change. These are not true intraday extremes and
    // should be replaced once a real range source is wired in.
    let reported_change = coerce_f64(rate.get(rate_keys::CHANGE));

    let bid = positive(rate.get(rate_keys::BID));
    let ask = positive(rate.get(rate_keys::ASK));
    let spread = match (bid, ask) {
        (Some(bid), Some(ask)) => Some(ask - bid),
        _ => None,
    };

    Quote {
        symbol: instrument.symbol.clone(),
        price,
        change,
        change_pct,
        high: price + reported_change,
        low: price - reported_change,
        open: previous_close,
        previous_close,
        timestamp: rate
            .get(rate_keys::LAST_REFRESHED)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        volume: rate.get(rate_keys::VOLUME).map(|v| coerce_f64(Some(v))),
        bid,
        ask,
        spread,
        pip_value: instrument.pip_value(),
        pip_decimal_places: instrument.pip_decimal_places,
        asset_class: instrument.asset_class,
    }
}

fn required(entry: &Map<String, Value>, label: &str, field: &str) -> Result<f64, MarketDataError> {
    entry
        .get(field)
        .and_then(parse_f64)
        .ok_or_else(|| MarketDataError::MalformedEntry {
            entry: label.to_string(),
            field: field.to_string(),
        })
}

fn fx_candle(label: &str, entry: &Value) -> Result<Candle, MarketDataError> {
    let entry = entry.as_object().ok_or_else(|| MarketDataError::MalformedEntry {
        entry: label.to_string(),
        field: "object".to_string(),
    })?;

    Ok(Candle {
        time: label.to_string(),
        open: required(entry, label, fx_keys::OPEN)?,
        high: required(entry, label, fx_keys::HIGH)?,
        low: required(entry, label, fx_keys::LOW)?,
        close: required(entry, label, fx_keys::CLOSE)?,
        volume: entry.get(fx_keys::VOLUME).and_then(parse_f64),
    })
}

/// Sort a timestamp-keyed series newest first.
pub(crate) fn newest_first(series: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = series.iter().collect();
    entries.sort_by(|a, b| b.0.cmp(a.0));
    entries
}

/// Map a timestamp-keyed FX series onto at most `count` candles, newest first.
///
/// OHLC are required; volume is optional since FX series usually omit it.
pub fn fx_series(series: &Map<String, Value>, count: usize) -> Vec<Candle> {
    newest_first(series)
        .into_iter()
        .filter_map(|(label, entry)| match fx_candle(label, entry) {
            Ok(candle) => Some(candle),
            Err(e) => {
                debug!("Dropping FX entry: {}", e);
                None
            }
        })
        .take(count)
        .collect()
}

/// Label used for epoch-derived candles.
pub(crate) fn epoch_label(timestamp: i64) -> Option<String> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// Zip the parallel arrays of a legacy candle response into at most `count`
/// candles, newest first.
///
/// Records beyond the shortest OHLC/time array are ignored; volume is taken
/// when its array reaches that far.
pub fn legacy_candles(response: &CandleResponse, count: usize) -> Vec<Candle> {
    let len = [
        response.t.len(),
        response.o.len(),
        response.h.len(),
        response.l.len(),
        response.c.len(),
    ]
    .into_iter()
    .min()
    .unwrap_or(0);

    let mut rows: Vec<(i64, Candle)> = (0..len)
        .filter_map(|i| {
            let timestamp = response.t[i];
            let Some(time) = epoch_label(timestamp) else {
                debug!("Dropping legacy candle with invalid timestamp {}", timestamp);
                return None;
            };
            let candle = Candle {
                time,
                open: response.o[i],
                high: response.h[i],
                low: response.l[i],
                close: response.c[i],
                volume: response.v.get(i).copied(),
            };
            let finite = [candle.open, candle.high, candle.low, candle.close]
                .iter()
                .all(|v| v.is_finite());
            finite.then_some((timestamp, candle))
        })
        .collect();

    rows.sort_by(|a, b| b.0.cmp(&a.0));
    rows.into_iter().take(count).map(|(_, candle)| candle).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InstrumentCatalog;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_coerce_f64() {
        assert_eq!(coerce_f64(Some(&json!("1.0850"))), 1.085);
        assert_eq!(coerce_f64(Some(&json!(2.5))), 2.5);
        assert_eq!(coerce_f64(Some(&json!("n/a"))), 0.0);
        assert_eq!(coerce_f64(Some(&json!(null))), 0.0);
        assert_eq!(coerce_f64(None), 0.0);
    }

    #[test]
    fn test_fx_quote_full_payload() {
        let catalog = InstrumentCatalog::builtin();
        let eur = catalog.resolve("EURUSD").unwrap();
        let rate = object(json!({
            "1. From_Currency Code": "EUR",
            "5. Exchange Rate": "1.1000",
            "6. Last Refreshed": "2024-01-15 16:00:01",
            "8. Previous Close": "1.0000",
            "9. Change": "0.0050",
            "8. Bid Price": "1.0999",
            "9. Ask Price": "1.1001",
            "10. Volume": "1200"
        }));

        let quote = fx_quote(eur, &rate);
        assert_eq!(quote.symbol, "EURUSD");
        assert_eq!(quote.price, 1.1);
        assert!((quote.change - 0.1).abs() < 1e-12);
        assert!((quote.change_pct - 10.0).abs() < 1e-9);
        assert!((quote.high - 1.105).abs() < 1e-12);
        assert!((quote.low - 1.095).abs() < 1e-12);
        assert_eq!(quote.open, 1.0);
        assert_eq!(quote.timestamp, "2024-01-15 16:00:01");
        assert_eq!(quote.volume, Some(1200.0));
        assert!((quote.spread.unwrap() - 0.0002).abs() < 1e-12);
        assert_eq!(quote.pip_value, 0.0001);
        assert_eq!(quote.pip_decimal_places, 4);
    }

    #[test]
    fn test_fx_quote_previous_close_defaults_to_price() {
        let catalog = InstrumentCatalog::builtin();
        let jpy = catalog.resolve("USDJPY").unwrap();
        let rate = object(json!({
            "5. Exchange Rate": "148.20",
            "6. Last Refreshed": "2024-01-15 16:00:01"
        }));

        let quote = fx_quote(jpy, &rate);
        assert_eq!(quote.previous_close, 148.2);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.change_pct, 0.0);
        assert_eq!(quote.high, 148.2);
        assert_eq!(quote.low, 148.2);
        assert_eq!(quote.volume, None);
        assert_eq!(quote.pip_value, 0.01);
    }

    #[test]
    fn test_fx_quote_zero_previous_close() {
        let catalog = InstrumentCatalog::builtin();
        let eur = catalog.resolve("EURUSD").unwrap();
        let rate = object(json!({
            "5. Exchange Rate": "1.1",
            "8. Previous Close": "0"
        }));

        let quote = fx_quote(eur, &rate);
        assert_eq!(quote.change_pct, 0.0);
        assert_eq!(quote.change, 1.1);
    }

    #[test]
    fn test_spread_absent_without_both_sides() {
        let catalog = InstrumentCatalog::builtin();
        let eur = catalog.resolve("EURUSD").unwrap();

        let bid_only = object(json!({"5. Exchange Rate": "1.1", "8. Bid Price": "1.0999"}));
        let quote = fx_quote(eur, &bid_only);
        assert_eq!(quote.bid, Some(1.0999));
        assert_eq!(quote.ask, None);
        assert_eq!(quote.spread, None);

        let zero_ask = object(json!({
            "5. Exchange Rate": "1.1",
            "8. Bid Price": "1.0999",
            "9. Ask Price": "0"
        }));
        let quote = fx_quote(eur, &zero_ask);
        assert_eq!(quote.ask, None);
        assert_eq!(quote.spread, None);
    }

    #[test]
    fn test_fx_quote_is_deterministic() {
        let catalog = InstrumentCatalog::builtin();
        let gold = catalog.resolve("XAUUSD").unwrap();
        let rate = object(json!({
            "5. Exchange Rate": "2031.55",
            "6. Last Refreshed": "2024-01-15 16:00:01",
            "8. Previous Close": "2020.10",
            "9. Change": "11.45"
        }));

        assert_eq!(fx_quote(gold, &rate), fx_quote(gold, &rate));
    }

    fn fx_entry(close: f64) -> Value {
        json!({
            "1. open": format!("{:.4}", close - 0.001),
            "2. high": format!("{:.4}", close + 0.002),
            "3. low": format!("{:.4}", close - 0.002),
            "4. close": format!("{:.4}", close),
        })
    }

    #[test]
    fn test_fx_series_truncates_newest_first() {
        let mut series = Map::new();
        for i in 0..200 {
            let label = format!("2024-01-15 {:02}:{:02}:00", i / 60, i % 60);
            series.insert(label, fx_entry(1.08 + i as f64 * 0.0001));
        }

        let candles = fx_series(&series, 50);
        assert_eq!(candles.len(), 50);
        assert_eq!(candles[0].time, "2024-01-15 03:19:00");
        for pair in candles.windows(2) {
            assert!(pair[0].time > pair[1].time);
        }
        assert!(candles.iter().all(|c| c.volume.is_none()));
    }

    #[test]
    fn test_fx_series_drops_malformed_before_truncating() {
        let series = object(json!({
            "2024-01-15": {"1. open": "1.1", "2. high": "1.2", "3. low": "1.0"},
            "2024-01-14": fx_entry(1.09),
            "2024-01-13": "garbage",
            "2024-01-12": fx_entry(1.07),
            "2024-01-11": fx_entry(1.06)
        }));

        let candles = fx_series(&series, 2);
        let times: Vec<_> = candles.iter().map(|c| c.time.as_str()).collect();
        assert_eq!(times, vec!["2024-01-14", "2024-01-12"]);
    }

    #[test]
    fn test_fx_series_idempotent() {
        let series = object(json!({
            "2024-01-15": fx_entry(1.09),
            "2024-01-14": fx_entry(1.08)
        }));
        assert_eq!(fx_series(&series, 10), fx_series(&series, 10));
    }

    #[test]
    fn test_legacy_candles_zip_and_sort() {
        let response = CandleResponse {
            s: Some("ok".to_string()),
            t: vec![1_705_334_400, 1_705_334_700, 1_705_335_000],
            o: vec![1.0, 2.0, 3.0],
            h: vec![1.5, 2.5, 3.5],
            l: vec![0.5, 1.5, 2.5],
            c: vec![1.2, 2.2, 3.2],
            v: vec![10.0, 20.0],
        };

        let candles = legacy_candles(&response, 2);
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, "2024-01-15 16:10");
        assert_eq!(candles[0].close, 3.2);
        assert_eq!(candles[0].volume, None);
        assert_eq!(candles[1].time, "2024-01-15 16:05");
        assert_eq!(candles[1].volume, Some(20.0));
    }

    #[test]
    fn test_legacy_candles_ragged_arrays() {
        let response = CandleResponse {
            s: Some("ok".to_string()),
            t: vec![1_705_334_400, 1_705_334_700],
            o: vec![1.0],
            h: vec![1.5, 2.5],
            l: vec![0.5, 1.5],
            c: vec![1.2, 2.2],
            v: vec![],
        };

        let candles = legacy_candles(&response, 10);
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].time, "2024-01-15 16:00");
    }
}
