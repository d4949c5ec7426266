//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior
//! - [`RetryPolicy`]: Explicit exponential backoff for callers that opt in

mod retry;

pub use retry::{RetryClass, RetryPolicy};

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Only [`MarketDataError::Configuration`] is meant to cross the aggregator
/// boundary as a hard failure. Everything else degrades to an empty or partial
/// result at the aggregator, after being logged.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// A required API key (or other startup setting) is missing or invalid.
    /// The affected provider must not serve requests.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The symbol is not part of the instrument catalog.
    #[error("Unsupported symbol: {0}")]
    UnsupportedSymbol(String),

    /// The provider answered with a recognized error envelope
    /// (rate-limit note, error message or informational notice).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The response was valid but carried no usable data
    /// (empty series, missing payload, status other than "ok").
    #[error("No data: {provider} - {message}")]
    NoData {
        /// The provider that returned the empty response
        provider: String,
        /// What was missing
        message: String,
    },

    /// The wire call or the rate gate wait exceeded its deadline.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Connection failure or non-2xx HTTP status.
    #[error("Transport error: {provider} - {message}")]
    Transport {
        /// The provider that could not be reached
        provider: String,
        /// HTTP status or connection error description
        message: String,
    },

    /// A single raw record was missing a required field.
    /// Never escapes the normalizer: the record is dropped and the batch proceeds.
    #[error("Malformed entry {entry}: missing {field}")]
    MalformedEntry {
        /// Entry key (usually the timestamp label)
        entry: String,
        /// The field that could not be resolved
        field: String,
    },
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// Only transport failures are retryable, and only by a caller that wraps
    /// the fetch in an explicit [`RetryPolicy`]. No-data outcomes are terminal
    /// for the call that produced them.
    ///
    /// # Examples
    ///
    /// ```
    /// use fxdesk_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::UnsupportedSymbol("ZZZNOPE".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => RetryClass::WithBackoff,

            Self::Configuration(_)
            | Self::UnsupportedSymbol(_)
            | Self::ProviderError { .. }
            | Self::NoData { .. }
            | Self::MalformedEntry { .. } => RetryClass::Never,
        }
    }

    /// True for "valid response, nothing usable in it".
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::ProviderError { .. } | Self::NoData { .. })
    }

    /// True for connection, timeout and HTTP status failures.
    pub fn is_transport(&self) -> bool {
        self.retry_class() == RetryClass::WithBackoff
    }

    pub(crate) fn provider_error(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn no_data(provider: &str, message: impl Into<String>) -> Self {
        Self::NoData {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Maps a reqwest send/read failure onto the transport taxonomy.
    pub(crate) fn from_reqwest(provider: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
            }
        } else {
            Self::transport(provider, error.to_string())
        }
    }
}
