//! Short-lived cache of normalized quotes.
//!
//! Entries are never evicted in the background: staleness is checked at read
//! time (`age >= ttl` is a miss) and the next successful fetch overwrites the
//! entry. Writes replace the whole entry, so readers never see a partial quote.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::models::Quote;

/// Default time a quote is served from cache.
pub const DEFAULT_QUOTE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: Arc<Quote>,
    inserted_at: Instant,
}

/// TTL cache keyed by normalized instrument symbol.
#[derive(Debug)]
pub struct QuoteCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh quote for `symbol`, or `None` when absent or expired.
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        let entry = self.entries.get(symbol)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.quote.as_ref().clone())
    }

    /// Store `quote`, replacing any previous entry and restarting its TTL.
    pub fn put(&self, symbol: &str, quote: Quote) {
        self.entries.insert(
            symbol.to_string(),
            CacheEntry {
                quote: Arc::new(quote),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTE_TTL)
    }
}
