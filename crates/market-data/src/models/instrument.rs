use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Asset classification.
///
/// Determines which upstream endpoint and data shape a provider uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Exchange-traded equity or ETF
    #[default]
    Stock,
    /// Cryptocurrency
    Crypto,
    /// Currency pair (e.g. EUR/USD)
    Currency,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Crypto => "crypto",
            Self::Currency => "currency",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" | "equity" | "etf" => Ok(Self::Stock),
            "crypto" | "cryptocurrency" => Ok(Self::Crypto),
            "currency" | "fx" | "forex" => Ok(Self::Currency),
            other => Err(MarketDataError::InvalidFormat(format!(
                "Unknown asset class: {}",
                other
            ))),
        }
    }
}

/// A currency pair split into its two ISO 4217 codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    /// Parse a pair written as `EUR/USD` or `EURUSD`.
    ///
    /// The code must be exactly 6 characters once `/` separators are removed.
    /// This runs before any network call so malformed input never reaches an
    /// upstream.
    pub fn parse(symbol: &str) -> Result<Self, MarketDataError> {
        let code: String = symbol
            .trim()
            .chars()
            .filter(|c| *c != '/')
            .collect::<String>()
            .to_uppercase();

        if code.chars().count() != 6 || !code.is_ascii() {
            return Err(MarketDataError::InvalidFormat(format!(
                "Currency pair must be 6 characters (e.g. EUR/USD or EURUSD), got '{}'",
                symbol
            )));
        }

        Ok(Self {
            from: code[..3].to_string(),
            to: code[3..].to_string(),
        })
    }

    /// The concatenated 6-character code, e.g. `EURUSD`.
    pub fn code(&self) -> String {
        format!("{}{}", self.from, self.to)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_class_parsing() {
        assert_eq!("stock".parse::<AssetClass>().unwrap(), AssetClass::Stock);
        assert_eq!("ETF".parse::<AssetClass>().unwrap(), AssetClass::Stock);
        assert_eq!("Crypto".parse::<AssetClass>().unwrap(), AssetClass::Crypto);
        assert_eq!("fx".parse::<AssetClass>().unwrap(), AssetClass::Currency);
        assert!("bond".parse::<AssetClass>().unwrap_err().is_format_error());
    }

    #[test]
    fn test_asset_class_serialization() {
        let json = serde_json::to_string(&AssetClass::Currency).unwrap();
        assert_eq!(json, "\"currency\"");
    }

    #[test]
    fn test_slash_and_plain_pairs_are_identical() {
        let slashed = CurrencyPair::parse("EUR/USD").unwrap();
        let plain = CurrencyPair::parse("EURUSD").unwrap();
        assert_eq!(slashed, plain);
        assert_eq!(plain.from, "EUR");
        assert_eq!(plain.to, "USD");
        assert_eq!(plain.code(), "EURUSD");
    }

    #[test]
    fn test_pair_is_upper_cased() {
        let pair = CurrencyPair::parse("gbp/jpy").unwrap();
        assert_eq!(pair.to_string(), "GBP/JPY");
    }

    #[test]
    fn test_five_character_pair_is_rejected() {
        let err = CurrencyPair::parse("EURUS").unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_seven_character_pair_is_rejected() {
        assert!(CurrencyPair::parse("EURUSDX").is_err());
    }
}
