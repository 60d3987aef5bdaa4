//! Error types for the market data crate.

use thiserror::Error;

/// Errors that can occur while downloading or decoding upstream data.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The upstream answered, but not with something usable
    /// (non-200 status, API level error).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The upstream that returned the error
        provider: String,
        /// The error message
        message: String,
    },

    /// The payload was received but does not have the expected structure.
    #[error("Parse error: {provider} - {message}")]
    ParseError {
        /// The upstream whose payload failed to parse
        provider: String,
        /// What was wrong with the payload
        message: String,
    },

    /// A network error occurred while communicating with an upstream.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    pub(crate) fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn parse(provider: &str, message: impl Into<String>) -> Self {
        Self::ParseError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}
