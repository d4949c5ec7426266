//! Static registry of supported instruments.
//!
//! Loads `instruments.json` at compile time via `include_str!` and builds the
//! symbol index once via `lazy_static`. The catalog is immutable after load,
//! so concurrent lookups need no locking.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, Instrument};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    instruments: Vec<Instrument>,
}

lazy_static! {
    static ref BUILTIN: Arc<InstrumentCatalog> = Arc::new(
        InstrumentCatalog::from_json(include_str!("instruments.json"))
            .expect("instruments.json must be valid")
    );
}

/// Normalize a user-supplied symbol: uppercase, `/` stripped, trimmed.
///
/// `"eur/usd"` and `"EURUSD"` resolve to the same instrument.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().replace('/', "").to_uppercase()
}

/// Ordered, immutable set of supported instruments.
#[derive(Debug)]
pub struct InstrumentCatalog {
    instruments: Vec<Instrument>,
    index: HashMap<String, usize>,
}

impl InstrumentCatalog {
    /// The catalog shipped with the crate, shared across the process.
    pub fn builtin() -> Arc<InstrumentCatalog> {
        Arc::clone(&BUILTIN)
    }

    /// Parse a catalog document (`{"instruments": [...]}`).
    ///
    /// Symbols are normalized on load; duplicates are rejected.
    pub fn from_json(json: &str) -> Result<Self, MarketDataError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| MarketDataError::Configuration(format!("Invalid instrument catalog: {}", e)))?;
        Self::from_instruments(file.instruments)
    }

    pub fn from_instruments(instruments: Vec<Instrument>) -> Result<Self, MarketDataError> {
        let mut normalized = Vec::with_capacity(instruments.len());
        let mut index = HashMap::with_capacity(instruments.len());

        for mut instrument in instruments {
            instrument.symbol = normalize_symbol(&instrument.symbol);
            if index.contains_key(&instrument.symbol) {
                return Err(MarketDataError::Configuration(format!(
                    "Duplicate instrument in catalog: {}",
                    instrument.symbol
                )));
            }
            index.insert(instrument.symbol.clone(), normalized.len());
            normalized.push(instrument);
        }

        Ok(Self {
            instruments: normalized,
            index,
        })
    }

    /// Look up an instrument, normalizing the input first.
    pub fn resolve(&self, symbol: &str) -> Result<&Instrument, MarketDataError> {
        let key = normalize_symbol(symbol);
        self.index
            .get(&key)
            .map(|&i| &self.instruments[i])
            .ok_or(MarketDataError::UnsupportedSymbol(key))
    }

    /// All instruments, in catalog order.
    pub fn list(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Instruments of one asset class, in catalog order.
    pub fn by_class(&self, class: AssetClass) -> impl Iterator<Item = &Instrument> {
        self.instruments
            .iter()
            .filter(move |i| i.asset_class == class)
    }

    /// Metadata keyed by symbol, as exposed to the "supported pairs" listing.
    pub fn supported_pairs(&self) -> BTreeMap<&str, &Instrument> {
        self.instruments
            .iter()
            .map(|i| (i.symbol.as_str(), i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
