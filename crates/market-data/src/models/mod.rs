//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `instrument` - Asset classification (AssetClass) and currency pair parsing
//! - `quote` - Quote data structures (PriceQuote, HistoricalPricePoint, QuoteRequest)
//! - `search` - Search result data (SymbolSearchMatch)

mod instrument;
mod quote;
mod search;

pub use instrument::{AssetClass, CurrencyPair};
pub use quote::{HistoricalPricePoint, OutputSize, PriceQuote, QuoteRequest};
pub use search::{compare_score_desc, dedup_by_symbol, format_score, SymbolSearchMatch};
