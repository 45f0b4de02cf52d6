//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`FailureClass`]: Classification used by the waterfall to decide between
//!   failover and aborting

mod classify;

pub use classify::{FailureClass, RATE_LIMIT_PATTERNS};

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into a [`FailureClass`] via the
/// [`failure_class`](Self::failure_class) method, which determines how the
/// provider registry reacts to it.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider cannot be used, usually because a credential is missing.
    /// The registry skips unavailable providers before calling them.
    #[error("Configuration error: {provider} - {message}")]
    Configuration {
        /// The misconfigured provider
        provider: String,
        /// What is missing or wrong
        message: String,
    },

    /// The caller supplied malformed input (e.g. a 5-character currency pair).
    /// Raised before any network call; the input is invalid for every provider,
    /// so the waterfall stops instead of failing over.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider throttled the request, either with HTTP 429 or with a
    /// sentinel field inside an HTTP 200 body.
    #[error("Rate limit exceeded: {provider} - {message}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
        /// The upstream message
        message: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred: non-2xx status, malformed payload,
    /// or an error sentinel in the body.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// Every available provider failed and every failure was a rate limit.
    #[error("All providers rate limited for symbol {symbol}")]
    AllProvidersRateLimited {
        /// The symbol being fetched
        symbol: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the failure classification for this error.
    ///
    /// - [`FailureClass::Abort`]: stop the waterfall and surface the error
    /// - [`FailureClass::RateLimit`]: fail over, counts toward "all rate limited"
    /// - [`FailureClass::Failover`]: fail over
    ///
    /// # Examples
    ///
    /// ```
    /// use pricefeed_market_data::errors::{FailureClass, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited {
    ///     provider: "YAHOO".to_string(),
    ///     message: "Too Many Requests".to_string(),
    /// };
    /// assert_eq!(error.failure_class(), FailureClass::RateLimit);
    ///
    /// let error = MarketDataError::InvalidFormat("EURUS".to_string());
    /// assert_eq!(error.failure_class(), FailureClass::Abort);
    /// ```
    pub fn failure_class(&self) -> FailureClass {
        if self.is_format_error() {
            FailureClass::Abort
        } else if self.is_rate_limit() {
            FailureClass::RateLimit
        } else {
            FailureClass::Failover
        }
    }

    /// Whether the error message matches one of the rate-limit patterns.
    ///
    /// Classification works on the rendered message rather than the variant so
    /// that transport errors (e.g. a reqwest error mentioning "429") and
    /// provider errors whose text reveals throttling are treated the same way.
    pub fn is_rate_limit(&self) -> bool {
        classify::message_indicates_rate_limit(&self.to_string())
    }

    /// Whether this is a pre-network input validation failure.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidFormat(_))
    }

    pub(crate) fn provider(provider: &str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn rate_limited(provider: &str, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_is_classified_as_rate_limit() {
        let error = MarketDataError::rate_limited("ALPHA_VANTAGE", "5 calls per minute");
        assert!(error.is_rate_limit());
        assert_eq!(error.failure_class(), FailureClass::RateLimit);
    }

    #[test]
    fn test_provider_error_with_throttle_text_is_rate_limit() {
        let error = MarketDataError::provider("YAHOO", "HTTP 429 Too Many Requests");
        assert_eq!(error.failure_class(), FailureClass::RateLimit);

        let error = MarketDataError::provider("YAHOO", "Monthly quota exceeded");
        assert_eq!(error.failure_class(), FailureClass::RateLimit);
    }

    #[test]
    fn test_plain_provider_error_fails_over() {
        let error = MarketDataError::provider("YAHOO", "Internal server error");
        assert!(!error.is_rate_limit());
        assert_eq!(error.failure_class(), FailureClass::Failover);
    }

    #[test]
    fn test_format_error_aborts() {
        let error = MarketDataError::InvalidFormat("EURUS".to_string());
        assert!(error.is_format_error());
        assert_eq!(error.failure_class(), FailureClass::Abort);
    }

    #[test]
    fn test_all_rate_limited_is_distinct_from_provider_error() {
        let error = MarketDataError::AllProvidersRateLimited {
            symbol: "AAPL".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "All providers rate limited for symbol AAPL"
        );
        assert!(!matches!(error, MarketDataError::ProviderError { .. }));
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::ProviderError {
            provider: "ALPHA_VANTAGE".to_string(),
            message: "API key invalid".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Provider error: ALPHA_VANTAGE - API key invalid"
        );
    }
}
