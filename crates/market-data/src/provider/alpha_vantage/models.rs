//! Alpha Vantage API response models.
//!
//! Alpha Vantage answers HTTP 200 for most failures and reports them through
//! sentinel fields ("Error Message", "Note", "Information") in the body, so
//! every response is first read as [`ApiSentinels`] before its typed payload.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Sentinel fields present on error, throttle and notice responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiSentinels {
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
}

/// GLOBAL_QUOTE response for equities.
///
/// Unknown symbols come back as `"Global Quote": {}`.
#[derive(Debug, Deserialize)]
pub struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    pub global_quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
pub struct GlobalQuote {
    #[serde(rename = "05. price")]
    pub price: Option<String>,
    #[serde(rename = "07. latest trading day")]
    pub latest_trading_day: Option<String>,
}

/// TIME_SERIES_DAILY response for equities
#[derive(Debug, Deserialize)]
pub struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    pub time_series: Option<HashMap<String, DailyBar>>,
}

/// Daily bar. The adjusted series carries "5. adjusted close" and moves
/// volume to "6. volume".
#[derive(Debug, Deserialize)]
pub struct DailyBar {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. adjusted close")]
    pub adjusted_close: Option<String>,
    #[serde(rename = "5. volume", alias = "6. volume")]
    pub volume: Option<String>,
}

/// FX_DAILY response for forex pairs
#[derive(Debug, Deserialize)]
pub struct FxDailyResponse {
    #[serde(rename = "Time Series FX (Daily)")]
    pub time_series: Option<HashMap<String, FxDailyBar>>,
}

#[derive(Debug, Deserialize)]
pub struct FxDailyBar {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
}

/// CURRENCY_EXCHANGE_RATE response for the current FX rate
#[derive(Debug, Deserialize)]
pub struct ExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    pub rate: Option<ExchangeRate>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRate {
    #[serde(rename = "5. Exchange Rate")]
    pub exchange_rate: Option<String>,
    /// "2024-01-15 10:00:01"
    #[serde(rename = "6. Last Refreshed")]
    pub last_refreshed: Option<String>,
}

/// DIGITAL_CURRENCY_DAILY response for cryptocurrencies
#[derive(Debug, Deserialize)]
pub struct CryptoDailyResponse {
    #[serde(rename = "Time Series (Digital Currency Daily)")]
    pub time_series: Option<HashMap<String, CryptoDailyBar>>,
}

/// Crypto daily bar with field names that depend on the API generation:
/// "4a. close (USD)" in older responses, "4. close" in current ones.
#[derive(Debug, Deserialize)]
pub struct CryptoDailyBar {
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl CryptoDailyBar {
    /// First field whose key starts with one of `prefixes`, tried in order.
    fn field(&self, prefixes: &[&str]) -> Option<Decimal> {
        prefixes.iter().find_map(|prefix| {
            self.fields
                .iter()
                .find(|(key, _)| key.starts_with(prefix))
                .and_then(|(_, value)| value.as_str())
                .and_then(parse_decimal)
        })
    }

    pub fn open(&self) -> Option<Decimal> {
        self.field(&["1. open", "1a. open", "1b. open"])
    }

    pub fn high(&self) -> Option<Decimal> {
        self.field(&["2. high", "2a. high", "2b. high"])
    }

    pub fn low(&self) -> Option<Decimal> {
        self.field(&["3. low", "3a. low", "3b. low"])
    }

    pub fn close(&self) -> Option<Decimal> {
        self.field(&["4. close", "4a. close", "4b. close"])
    }

    pub fn volume(&self) -> Option<Decimal> {
        self.field(&["5. volume"])
    }
}

/// SYMBOL_SEARCH response
#[derive(Debug, Deserialize)]
pub struct SymbolSearchResponse {
    #[serde(rename = "bestMatches")]
    pub best_matches: Option<Vec<BestMatch>>,
}

#[derive(Debug, Deserialize)]
pub struct BestMatch {
    #[serde(rename = "1. symbol", default)]
    pub symbol: String,
    #[serde(rename = "2. name", default)]
    pub name: String,
    #[serde(rename = "3. type", default)]
    pub asset_type: String,
    #[serde(rename = "4. region", default)]
    pub region: String,
    #[serde(rename = "5. marketOpen", default)]
    pub market_open: String,
    #[serde(rename = "6. marketClose", default)]
    pub market_close: String,
    #[serde(rename = "7. timezone", default)]
    pub timezone: String,
    #[serde(rename = "8. currency", default)]
    pub currency: String,
    #[serde(rename = "9. matchScore", default)]
    pub match_score: String,
}

/// Parse "YYYY-MM-DD", ignoring any trailing time component.
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let date_part = date_str.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse a decimal value from a string.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s.trim()).ok()
}
