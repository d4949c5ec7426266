//! Alpha Vantage wire conventions: functions, series keys and error envelopes.

use log::debug;
use serde_json::Value;

use crate::models::Resolution;

pub(crate) const CURRENCY_EXCHANGE_RATE: &str = "CURRENCY_EXCHANGE_RATE";
pub(crate) const DIGITAL_CURRENCY_DAILY: &str = "DIGITAL_CURRENCY_DAILY";

/// Top-level key of the exchange-rate payload.
pub(crate) const EXCHANGE_RATE_KEY: &str = "Realtime Currency Exchange Rate";

/// Top-level key of the digital-currency daily series.
pub(crate) const CRYPTO_DAILY_KEY: &str = "Time Series (Digital Currency Daily)";

/// Keys whose presence marks a response as an error, whatever else it holds.
const ENVELOPE_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Return the upstream message when `payload` is an error envelope.
///
/// An empty body counts as an error too.
pub(crate) fn envelope_message(payload: &Value) -> Option<String> {
    let Some(object) = payload.as_object() else {
        return Some("Unexpected response shape".to_string());
    };
    if object.is_empty() {
        return Some("Empty response from API".to_string());
    }

    ENVELOPE_KEYS.iter().find_map(|key| {
        object.get(*key).map(|message| match message {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    })
}

/// Which FX series to request for a resolution, and where its data lives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FxSeriesRequest {
    pub function: &'static str,
    pub interval: Option<String>,
    pub series_key: String,
}

impl FxSeriesRequest {
    pub fn for_resolution(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Minutes(minutes) => {
                let interval = format!("{}min", minutes);
                Self {
                    function: "FX_INTRADAY",
                    series_key: format!("Time Series FX ({})", interval),
                    interval: Some(interval),
                }
            }
            Resolution::Period(code) => {
                let (function, label) = match code.as_str() {
                    "W" | "1W" => ("FX_WEEKLY", "Weekly"),
                    "M" | "1M" => ("FX_MONTHLY", "Monthly"),
                    "D" | "1D" => ("FX_DAILY", "Daily"),
                    other => {
                        debug!("Unknown period '{}', using daily series", other);
                        ("FX_DAILY", "Daily")
                    }
                };
                Self {
                    function,
                    interval: None,
                    series_key: format!("Time Series FX ({})", label),
                }
            }
        }
    }
}

/// `compact` returns the latest 100 points; anything larger needs `full`.
pub(crate) fn output_size(count: usize) -> &'static str {
    if count <= 100 {
        "compact"
    } else {
        "full"
    }
}
