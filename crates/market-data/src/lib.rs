//! Pricefeed Market Data Crate
//!
//! This crate fetches prices from several upstream providers behind one
//! provider-agnostic interface, failing over between them when one is
//! throttled or broken.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple asset classes: equities/ETFs, cryptocurrencies, FX pairs
//! - Multiple providers: Alpha Vantage (keyed) and Yahoo Finance (keyless)
//! - Latest quotes, daily history, symbol search, and paced batch quotes
//! - Rate-limit aware failover
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     Caller       |  (CLI, scheduler, UI)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | ProviderRegistry |  (waterfall, pacing, search merge)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! |  PriceProvider   | --> | AlphaVantage     |  (+ crypto catalog cache)
//! |     (trait)      | --> | Yahoo            |
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------------------------------+
//! | PriceQuote / HistoricalPricePoint /      |
//! | SymbolSearchMatch                        |  (provider-tagged records)
//! +------------------------------------------+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pricefeed_market_data::{AssetClass, MarketDataConfig, ProviderRegistry};
//!
//! # async fn run() -> Result<(), pricefeed_market_data::MarketDataError> {
//! let config = MarketDataConfig::from_env()?;
//! let registry = ProviderRegistry::from_config(&config).await?;
//!
//! if let Some(quote) = registry.fetch_current_quote("AAPL", AssetClass::Stock, "USD").await? {
//!     println!("{} {} ({})", quote.symbol, quote.price, quote.provider);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use config::MarketDataConfig;
pub use errors::{FailureClass, MarketDataError};

// Re-export all public types from models
pub use models::{
    AssetClass, CurrencyPair, HistoricalPricePoint, OutputSize, PriceQuote, QuoteRequest,
    SymbolSearchMatch,
};

// Re-export provider types
pub use provider::alpha_vantage::{AlphaVantagePlan, AlphaVantageProvider};
pub use provider::yahoo::YahooProvider;
pub use provider::PriceProvider;

// Re-export registry types
pub use registry::{FetchDiagnostics, ProviderRegistry, ProviderStats, SkipReason};
