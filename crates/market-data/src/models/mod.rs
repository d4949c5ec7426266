//! Market data models
//!
//! This module contains the canonical data types returned by the core:
//! - `instrument` - Catalog entries (Instrument) and the AssetClass enum
//! - `quote` - Normalized real-time quote (Quote)
//! - `candle` - Normalized OHLCV record (Candle) and request Resolution

mod candle;
mod instrument;
mod quote;

pub use candle::{Candle, Resolution};
pub use instrument::{AssetClass, Instrument};
pub use quote::Quote;
