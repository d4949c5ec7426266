use serde::{Deserialize, Serialize};

/// Normalized OHLCV record.
///
/// `time` keeps the provider's native granularity label (`2024-01-15 16:00:00`
/// for intraday series, `2024-01-15` for daily ones, `2024-01-15 16:00` for
/// epoch-derived legacy candles).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Requested candle granularity.
///
/// Numeric request strings are minute buckets; anything else (`D`, `W`, `M`)
/// is passed through as a period code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Resolution {
    Minutes(u32),
    Period(String),
}

impl Resolution {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u32>() {
            Ok(minutes) if minutes > 0 => Self::Minutes(minutes),
            _ => Self::Period(trimmed.to_uppercase()),
        }
    }

    /// Length of the lookback window covering `count` candles, in seconds.
    ///
    /// `minutes * count * 60` for minute buckets, `count` days otherwise.
    pub fn window_secs(&self, count: usize) -> i64 {
        let count = count as i64;
        match self {
            Self::Minutes(minutes) => i64::from(*minutes) * count * 60,
            Self::Period(_) => count * 86_400,
        }
    }

    /// Wire form used by the legacy candle endpoint.
    pub fn code(&self) -> String {
        match self {
            Self::Minutes(minutes) => minutes.to_string(),
            Self::Period(code) => code.clone(),
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Minutes(5)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minutes(minutes) => write!(f, "{}min", minutes),
            Self::Period(code) => f.write_str(code),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
