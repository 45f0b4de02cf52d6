//! CLI argument definitions for `pricefeed`.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Latest quote for one symbol |
//! | `history` | Daily history for one symbol |
//! | `search` | Search symbols across providers |
//! | `batch` | Quotes for several symbols, paced |
//! | `stats` | Registered providers and their pacing |
//! | `market-hours` | Whether US markets are open now |

use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use pricefeed_market_data::{AssetClass, QuoteRequest};

#[derive(Debug, Parser)]
#[command(
    name = "pricefeed",
    version,
    about = "Multi-provider price lookup with automatic failover"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the latest quote for a symbol.
    Quote(SymbolArgs),

    /// Fetch daily price history for a symbol.
    History {
        #[command(flatten)]
        symbol: SymbolArgs,

        /// Request the full history instead of the recent window.
        #[arg(long)]
        full: bool,
    },

    /// Search for symbols matching keywords.
    Search {
        /// Free-text keywords, e.g. "apple" or "BTC".
        keywords: String,
    },

    /// Fetch quotes for several symbols, e.g. `AAPL:stock BTC:crypto EURUSD:currency:USD`.
    Batch {
        #[arg(required = true, value_parser = parse_batch_entry)]
        entries: Vec<QuoteRequest>,
    },

    /// Show registered providers.
    Stats,

    /// Check whether US equity markets are open.
    MarketHours,
}

#[derive(Debug, Args)]
pub struct SymbolArgs {
    /// Symbol as the caller knows it (AAPL, BTC, EUR/USD).
    pub symbol: String,

    /// stock, crypto or currency.
    #[arg(long, short = 'a', default_value = "stock", value_parser = AssetClass::from_str)]
    pub asset_class: AssetClass,

    /// Quote currency.
    #[arg(long, short = 'c', default_value = "USD")]
    pub currency: String,
}

/// Parse `SYMBOL:CLASS[:CCY]`. The class defaults to stock, the currency to USD.
pub fn parse_batch_entry(raw: &str) -> Result<QuoteRequest, String> {
    let mut parts = raw.split(':');
    let symbol = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing symbol in '{}'", raw))?;

    let asset_class = match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        Some(class) => class.parse::<AssetClass>().map_err(|e| e.to_string())?,
        None => AssetClass::Stock,
    };

    let currency = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("USD")
        .to_uppercase();

    if parts.next().is_some() {
        return Err(format!("expected SYMBOL:CLASS[:CCY], got '{}'", raw));
    }

    Ok(QuoteRequest::new(symbol, asset_class, currency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_entry() {
        let request = parse_batch_entry("BTC:crypto").unwrap();
        assert_eq!(request.symbol, "BTC");
        assert_eq!(request.asset_class, AssetClass::Crypto);
        assert_eq!(request.currency, "USD");

        let request = parse_batch_entry("EURUSD:fx:usd").unwrap();
        assert_eq!(request.asset_class, AssetClass::Currency);
        assert_eq!(request.currency, "USD");

        let request = parse_batch_entry("AAPL").unwrap();
        assert_eq!(request.asset_class, AssetClass::Stock);
    }

    #[test]
    fn test_parse_batch_entry_rejects_garbage() {
        assert!(parse_batch_entry(":crypto").is_err());
        assert!(parse_batch_entry("BTC:bond").is_err());
        assert!(parse_batch_entry("BTC:crypto:USD:extra").is_err());
    }

    #[test]
    fn test_history_flags() {
        let cli = Cli::parse_from(["pricefeed", "history", "ETH", "-a", "crypto", "--full"]);
        match cli.command {
            Command::History { symbol, full } => {
                assert_eq!(symbol.symbol, "ETH");
                assert_eq!(symbol.asset_class, AssetClass::Crypto);
                assert!(full);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
