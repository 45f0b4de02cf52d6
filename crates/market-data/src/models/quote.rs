use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::instrument::AssetClass;
use crate::errors::MarketDataError;

/// How much history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputSize {
    /// Recent history only (roughly the last 100 trading days)
    #[default]
    Compact,
    /// As much history as the provider offers
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl FromStr for OutputSize {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(MarketDataError::InvalidFormat(format!(
                "Unknown output size: {}",
                other
            ))),
        }
    }
}

/// Point-in-time price for a symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,

    pub price: Decimal,

    /// Trading day the price belongs to (serialized as `YYYY-MM-DD`)
    pub date: NaiveDate,

    /// Provider that produced the quote (e.g. "ALPHA_VANTAGE", "YAHOO")
    pub provider: String,
}

impl PriceQuote {
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        date: NaiveDate,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            date,
            provider: provider.into(),
        }
    }
}

/// One daily OHLC bar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPricePoint {
    pub symbol: String,

    pub date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    pub close: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Split/dividend adjusted close. Equal to `close` when the upstream has none.
    pub adjusted_close: Decimal,

    /// Human-readable data source label (e.g. "Alpha Vantage")
    pub data_source: String,

    pub asset_class: AssetClass,

    /// Currency the prices are quoted in
    pub base_currency: String,

    pub provider: String,
}

impl HistoricalPricePoint {
    /// Create a close-only point. `adjusted_close` defaults to `close`.
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        close: Decimal,
        asset_class: AssetClass,
        base_currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            adjusted_close: close,
            data_source: String::new(),
            asset_class,
            base_currency: base_currency.into(),
            provider: String::new(),
        }
    }

    /// Set open/high/low.
    pub fn with_ohl(
        mut self,
        open: Option<Decimal>,
        high: Option<Decimal>,
        low: Option<Decimal>,
    ) -> Self {
        self.open = open;
        self.high = high;
        self.low = low;
        self
    }

    pub fn with_volume(mut self, volume: Option<Decimal>) -> Self {
        self.volume = volume;
        self
    }

    /// Set the adjusted close, keeping `close` when `None`.
    pub fn with_adjusted_close(mut self, adjusted_close: Option<Decimal>) -> Self {
        self.adjusted_close = adjusted_close.unwrap_or(self.close);
        self
    }

    /// Set data source label and provider tag.
    pub fn with_source(
        mut self,
        data_source: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        self.data_source = data_source.into();
        self.provider = provider.into();
        self
    }
}

/// A single entry of a batch quote request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub currency: String,
}

impl QuoteRequest {
    pub fn new(
        symbol: impl Into<String>,
        asset_class: AssetClass,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            asset_class,
            currency: currency.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_adjusted_close_defaults_to_close() {
        let point = HistoricalPricePoint::new(
            "AAPL",
            day(2024, 1, 15),
            dec!(185.92),
            AssetClass::Stock,
            "USD",
        )
        .with_adjusted_close(None);
        assert_eq!(point.adjusted_close, dec!(185.92));

        let point = point.with_adjusted_close(Some(dec!(185.10)));
        assert_eq!(point.adjusted_close, dec!(185.10));
        assert_eq!(point.close, dec!(185.92));
    }

    #[test]
    fn test_quote_serializes_date_as_calendar_day() {
        let quote = PriceQuote::new("AAPL", dec!(150.25), day(2024, 1, 15), "YAHOO");
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["provider"], "YAHOO");
    }

    #[test]
    fn test_point_skips_missing_ohlv() {
        let point = HistoricalPricePoint::new(
            "EURUSD",
            day(2024, 1, 15),
            dec!(1.0950),
            AssetClass::Currency,
            "USD",
        )
        .with_source("Alpha Vantage", "ALPHA_VANTAGE");
        let json = serde_json::to_string(&point).unwrap();
        assert!(!json.contains("volume"));
        assert!(!json.contains("\"open\""));
        assert!(json.contains("\"assetClass\":\"currency\""));
    }

    #[test]
    fn test_output_size_parsing() {
        assert_eq!("FULL".parse::<OutputSize>().unwrap(), OutputSize::Full);
        assert_eq!("compact".parse::<OutputSize>().unwrap(), OutputSize::Compact);
        assert!("huge".parse::<OutputSize>().is_err());
    }
}
