use serde::{Deserialize, Serialize};

/// Asset classification. Selects the fetcher and the pip convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    #[default]
    Forex,
    PreciousMetal,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forex => "forex",
            Self::PreciousMetal => "precious_metal",
            Self::Crypto => "crypto",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_pip_decimal_places() -> u32 {
    4
}

fn default_lot_size() -> u64 {
    100_000
}

/// A supported instrument: forex pair, precious metal or crypto pair.
///
/// Immutable once the catalog is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    /// Normalized symbol, e.g. `EURUSD`
    pub symbol: String,

    /// Display name, e.g. `Euro / US Dollar`
    pub name: String,

    /// Base currency (or metal / coin code)
    pub base: String,

    /// Quote currency; the settlement market for crypto
    pub quote: String,

    pub asset_class: AssetClass,

    /// 4 for most pairs, 2 for JPY-quoted pairs, metals and crypto
    #[serde(default = "default_pip_decimal_places")]
    pub pip_decimal_places: u32,

    /// Standard lot in units of the base currency
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
}

impl Instrument {
    /// Value of one pip: `10^-pip_decimal_places`.
    pub fn pip_value(&self) -> f64 {
        pip_value(self.pip_decimal_places)
    }
}

/// `10^-decimal_places`, computed as a division so common cases are exact
/// (`4 -> 0.0001`, `2 -> 0.01`).
pub(crate) fn pip_value(decimal_places: u32) -> f64 {
    1.0 / 10f64.powi(decimal_places as i32)
}
