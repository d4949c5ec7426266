use serde::{Deserialize, Serialize};

use super::instrument::AssetClass;

/// Normalized real-time quote.
///
/// Invariants held by the normalizer:
/// - `pip_value == 10^-pip_decimal_places`
/// - `spread` is `Some(ask - bid)` only when both `bid` and `ask` are present
/// - `change_pct == change / previous_close * 100`, or `0` when `previous_close == 0`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,

    /// Current price (exchange rate)
    pub price: f64,

    /// Absolute change versus previous close
    pub change: f64,

    /// Percentage change versus previous close
    pub change_pct: f64,

    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,

    /// Upstream-reported refresh time, verbatim. Not the fetch time.
    pub timestamp: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,

    pub pip_value: f64,
    pub pip_decimal_places: u32,
    pub asset_class: AssetClass,
}
