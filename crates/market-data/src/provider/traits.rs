//! Market data provider trait definitions.
//!
//! This module defines the core `PriceProvider` trait that all
//! market data providers must implement.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{AssetClass, HistoricalPricePoint, OutputSize, PriceQuote, SymbolSearchMatch};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source.
/// The registry walks providers in registration order and only uses those
/// that are both [`enabled`](Self::enabled) and [`is_available`](Self::is_available).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use pricefeed_market_data::provider::PriceProvider;
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl PriceProvider for MyProvider {
///     fn name(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn is_available(&self) -> bool {
///         !self.api_key.is_empty()
///     }
///
///     fn rate_limit_delay(&self) -> Duration {
///         Duration::from_secs(1)
///     }
///
///     // ... implement fetch and search methods
/// }
/// ```
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO", "ALPHA_VANTAGE", etc.
    /// Every record the provider returns is tagged with it.
    fn name(&self) -> &'static str;

    /// Static policy flag. Operators can disable a provider without removing it.
    fn enabled(&self) -> bool {
        true
    }

    /// Dynamic availability, e.g. whether a required credential is present.
    /// Independent of [`enabled`](Self::enabled).
    fn is_available(&self) -> bool;

    /// How long to wait before/between calls to this provider.
    fn rate_limit_delay(&self) -> Duration;

    /// Fetch the latest quote for a symbol.
    ///
    /// Returns `Ok(None)` when the provider has no quote for the symbol.
    async fn fetch_current_quote(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
    ) -> Result<Option<PriceQuote>, MarketDataError>;

    /// Fetch daily history for a symbol, ordered by date ascending.
    ///
    /// An empty vector means the provider has no data for the symbol.
    async fn fetch_historical_prices(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
        size: OutputSize,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError>;

    /// Search for symbols matching the keywords, most relevant first.
    ///
    /// No matches is `Ok(vec![])`; errors are reserved for genuine failures.
    async fn search_symbols(
        &self,
        keywords: &str,
    ) -> Result<Vec<SymbolSearchMatch>, MarketDataError>;
}
