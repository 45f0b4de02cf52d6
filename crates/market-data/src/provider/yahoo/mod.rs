//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance API to fetch market data for:
//! - Equities/ETFs (e.g., AAPL, SHOP.TO)
//! - Cryptocurrencies (e.g., BTC-USD)
//! - Foreign exchange rates (e.g., EURUSD=X)
//!
//! No API key is required, so the provider is always available.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{
    AssetClass, CurrencyPair, HistoricalPricePoint, OutputSize, PriceQuote, SymbolSearchMatch,
};
use crate::provider::PriceProvider;

const PROVIDER_ID: &str = "YAHOO";
const DATA_SOURCE: &str = "Yahoo Finance";
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// History window for [`OutputSize::Compact`].
const COMPACT_WINDOW_DAYS: i64 = 100;
/// History window for [`OutputSize::Full`].
const FULL_WINDOW_DAYS: i64 = 5 * 365;

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance market data provider.
///
/// Provides access to market data for equities, ETFs, cryptocurrencies,
/// and foreign exchange rates through the Yahoo Finance API.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub async fn new() -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!("Failed to initialize Yahoo connector: {}", e),
            )
        })?;
        Ok(Self { connector })
    }

    /// Convert chrono DateTime<Utc> to time::OffsetDateTime for the Yahoo API.
    fn chrono_to_offset_datetime(dt: DateTime<Utc>) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(dt.timestamp())
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    fn map_yahoo_error(symbol: &str, e: yahoo::YahooError) -> MarketDataError {
        match e {
            yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
                MarketDataError::SymbolNotFound(symbol.to_string())
            }
            // Request URLs embed the symbol, which may itself contain "429".
            yahoo::YahooError::ConnectionFailed(e) => {
                MarketDataError::provider(PROVIDER_ID, e.without_url().to_string())
            }
            e => MarketDataError::provider(PROVIDER_ID, e.to_string()),
        }
    }

    /// Convert a Yahoo bar into our history model.
    fn yahoo_quote_to_point(
        yahoo_quote: &yahoo::Quote,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
    ) -> Result<HistoricalPricePoint, MarketDataError> {
        let date = timestamp_to_date(yahoo_quote.timestamp as i64)?;

        // Close price is required
        let close = Decimal::from_f64_retain(yahoo_quote.close).ok_or_else(|| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!(
                    "Failed to convert close price {} to Decimal",
                    yahoo_quote.close
                ),
            )
        })?;

        Ok(
            HistoricalPricePoint::new(symbol, date, close, asset_class, currency)
                .with_ohl(
                    Decimal::from_f64_retain(yahoo_quote.open),
                    Decimal::from_f64_retain(yahoo_quote.high),
                    Decimal::from_f64_retain(yahoo_quote.low),
                )
                .with_volume(Decimal::from_u64(yahoo_quote.volume))
                .with_adjusted_close(Decimal::from_f64_retain(yahoo_quote.adjclose))
                .with_source(DATA_SOURCE, PROVIDER_ID),
        )
    }
}

// ============================================================================
// PriceProvider Implementation
// ============================================================================

#[async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &'static str {
        PROVIDER_ID
    }

    fn is_available(&self) -> bool {
        true
    }

    fn rate_limit_delay(&self) -> Duration {
        RATE_LIMIT_DELAY
    }

    async fn fetch_current_quote(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        _currency: &str,
    ) -> Result<Option<PriceQuote>, MarketDataError> {
        let yahoo_symbol = to_yahoo_symbol(symbol, asset_class)?;

        debug!("Fetching latest quote for {} from Yahoo", yahoo_symbol);

        let response = match self.connector.get_latest_quotes(&yahoo_symbol, "1d").await {
            Ok(response) => response,
            Err(e) => {
                return match Self::map_yahoo_error(&yahoo_symbol, e) {
                    MarketDataError::SymbolNotFound(_) => Ok(None),
                    other => Err(other),
                };
            }
        };

        let yahoo_quote = match response.last_quote() {
            Ok(quote) => quote,
            Err(e) => {
                warn!("No quotes returned for {}: {}", yahoo_symbol, e);
                return Ok(None);
            }
        };

        let price = Decimal::from_f64_retain(yahoo_quote.close).ok_or_else(|| {
            MarketDataError::provider(
                PROVIDER_ID,
                format!("Failed to convert price {} to Decimal", yahoo_quote.close),
            )
        })?;
        let date = timestamp_to_date(yahoo_quote.timestamp as i64)?;

        Ok(Some(PriceQuote::new(symbol, price, date, PROVIDER_ID)))
    }

    async fn fetch_historical_prices(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
        size: OutputSize,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
        let yahoo_symbol = to_yahoo_symbol(symbol, asset_class)?;
        let (start, end) = history_window(size, Utc::now());

        debug!(
            "Fetching historical quotes for {} from {} to {} from Yahoo",
            yahoo_symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let response = match self
            .connector
            .get_quote_history(
                &yahoo_symbol,
                Self::chrono_to_offset_datetime(start),
                Self::chrono_to_offset_datetime(end),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return match Self::map_yahoo_error(&yahoo_symbol, e) {
                    MarketDataError::SymbolNotFound(_) => Ok(Vec::new()),
                    other => Err(other),
                };
            }
        };

        let yahoo_quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(yahoo::YahooError::NoQuotes) => {
                warn!(
                    "No historical quotes returned for '{}' between {} and {}",
                    yahoo_symbol,
                    start.format("%Y-%m-%d"),
                    end.format("%Y-%m-%d")
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(Self::map_yahoo_error(&yahoo_symbol, e)),
        };

        let mut points: Vec<HistoricalPricePoint> = yahoo_quotes
            .iter()
            .filter_map(|q| {
                match Self::yahoo_quote_to_point(q, symbol, asset_class, currency) {
                    Ok(point) => Some(point),
                    Err(e) => {
                        warn!("Skipping quote due to conversion error: {}", e);
                        None
                    }
                }
            })
            .collect();

        points.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(points)
    }

    async fn search_symbols(
        &self,
        keywords: &str,
    ) -> Result<Vec<SymbolSearchMatch>, MarketDataError> {
        let query = keywords.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Searching Yahoo for '{}'", query);

        let encoded_query = encode(query);
        let result = match self.connector.search_ticker(&encoded_query).await {
            Ok(result) => result,
            Err(yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(Self::map_yahoo_error(query, e)),
        };

        let matches = result
            .quotes
            .iter()
            .filter(|item| !item.symbol.is_empty())
            .map(|item| {
                let name = format_name(
                    non_empty(&item.long_name),
                    &item.quote_type,
                    non_empty(&item.short_name),
                    &item.symbol,
                );
                SymbolSearchMatch::new(
                    item.symbol.as_str(),
                    name,
                    map_quote_type(&item.quote_type),
                    PROVIDER_ID,
                )
                .with_region(item.exchange.as_str())
                .with_score(item.score)
            })
            .collect();

        Ok(matches)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Translate a symbol into Yahoo's notation.
///
/// Crypto gets a `-USD` suffix unless it already names a market
/// (`ETH-EUR`); currency pairs become `EURUSD=X`.
pub fn to_yahoo_symbol(symbol: &str, asset_class: AssetClass) -> Result<String, MarketDataError> {
    let upper = symbol.trim().to_uppercase();
    if upper.is_empty() {
        return Err(MarketDataError::InvalidFormat("Empty symbol".to_string()));
    }

    match asset_class {
        AssetClass::Stock => Ok(upper),
        AssetClass::Crypto => {
            if upper.contains('-') {
                Ok(upper)
            } else {
                Ok(format!("{}-USD", upper))
            }
        }
        AssetClass::Currency => {
            if upper.ends_with("=X") {
                return Ok(upper);
            }
            let pair = CurrencyPair::parse(&upper)?;
            Ok(format!("{}=X", pair.code()))
        }
    }
}

/// Map Yahoo's quote type taxonomy to display labels.
pub fn map_quote_type(quote_type: &str) -> String {
    match quote_type.to_uppercase().as_str() {
        "EQUITY" => "Stock".to_string(),
        "CRYPTOCURRENCY" => "Cryptocurrency".to_string(),
        "CURRENCY" => "Currency".to_string(),
        "MUTUALFUND" => "Mutual Fund".to_string(),
        "INDEX" => "Index".to_string(),
        _ => quote_type.to_string(),
    }
}

/// `[start, end]` for a history request ending at `now`.
fn history_window(size: OutputSize, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let days = match size {
        OutputSize::Compact => COMPACT_WINDOW_DAYS,
        OutputSize::Full => FULL_WINDOW_DAYS,
    };
    (now - chrono::Duration::days(days), now)
}

/// Calendar day (UTC) of a Unix timestamp in seconds.
fn timestamp_to_date(timestamp: i64) -> Result<NaiveDate, MarketDataError> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.date_naive())
        .ok_or_else(|| {
            MarketDataError::provider(PROVIDER_ID, format!("Invalid timestamp: {}", timestamp))
        })
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.trim().is_empty())
}

/// Clean up fund names by removing common prefixes.
fn format_name(
    long_name: Option<&str>,
    quote_type: &str,
    short_name: Option<&str>,
    symbol: &str,
) -> String {
    let mut name = long_name.unwrap_or("").to_string();

    if !name.is_empty() {
        let replacements = [
            ("&amp;", "&"),
            ("Amundi Index Solutions - ", ""),
            ("iShares ETF (CH) - ", ""),
            ("iShares III Public Limited Company - ", ""),
            ("iShares V PLC - ", ""),
            ("iShares VI Public Limited Company - ", ""),
            ("iShares VII PLC - ", ""),
            ("Multi Units Luxembourg - ", ""),
            ("VanEck ETFs N.V. - ", ""),
            ("Vaneck Vectors Ucits Etfs Plc - ", ""),
            ("Vanguard Funds Public Limited Company - ", ""),
            ("Vanguard Index Funds - ", ""),
            ("Xtrackers (IE) Plc - ", ""),
        ];

        for (from, to) in &replacements {
            name = name.replace(from, to);
        }
    }

    // Futures carry a date suffix in the short name
    if quote_type.eq_ignore_ascii_case("FUTURE") {
        if let Some(sn) = short_name {
            if sn.len() >= 7 && sn.is_char_boundary(sn.len() - 7) {
                return sn[..sn.len() - 7].to_string();
            }
        }
    }

    if name.is_empty() {
        short_name.unwrap_or(symbol).to_string()
    } else {
        name
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name() {
        // Fund family prefix is stripped
        assert_eq!(
            format_name(
                Some("iShares VII PLC - iShares Core S&P 500"),
                "ETF",
                None,
                "IVV"
            ),
            "iShares Core S&P 500"
        );

        assert_eq!(
            format_name(Some("Apple Inc &amp; Co"), "EQUITY", None, "AAPL"),
            "Apple Inc & Co"
        );

        assert_eq!(format_name(None, "EQUITY", Some("AAPL Inc"), "AAPL"), "AAPL Inc");
        assert_eq!(format_name(None, "EQUITY", None, "AAPL"), "AAPL");
    }

    #[test]
    fn test_format_name_future() {
        assert_eq!(
            format_name(None, "FUTURE", Some("Gold Dec 24"), "GC=F"),
            "Gold"
        );
    }

    #[test]
    fn test_yahoo_symbol_equity() {
        assert_eq!(to_yahoo_symbol("aapl", AssetClass::Stock).unwrap(), "AAPL");
        assert_eq!(to_yahoo_symbol("shop.to", AssetClass::Stock).unwrap(), "SHOP.TO");
    }

    #[test]
    fn test_yahoo_symbol_crypto() {
        assert_eq!(to_yahoo_symbol("btc", AssetClass::Crypto).unwrap(), "BTC-USD");
        assert_eq!(to_yahoo_symbol("ETH-EUR", AssetClass::Crypto).unwrap(), "ETH-EUR");
    }

    #[test]
    fn test_yahoo_symbol_currency() {
        assert_eq!(to_yahoo_symbol("EUR/USD", AssetClass::Currency).unwrap(), "EURUSD=X");
        assert_eq!(to_yahoo_symbol("eurusd", AssetClass::Currency).unwrap(), "EURUSD=X");
        assert_eq!(to_yahoo_symbol("GBPUSD=X", AssetClass::Currency).unwrap(), "GBPUSD=X");

        let err = to_yahoo_symbol("EURUS", AssetClass::Currency).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_map_quote_type() {
        assert_eq!(map_quote_type("EQUITY"), "Stock");
        assert_eq!(map_quote_type("CRYPTOCURRENCY"), "Cryptocurrency");
        assert_eq!(map_quote_type("MUTUALFUND"), "Mutual Fund");
        assert_eq!(map_quote_type("INDEX"), "Index");
        assert_eq!(map_quote_type("ETF"), "ETF");
    }

    #[test]
    fn test_history_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let (start, end) = history_window(OutputSize::Compact, now);
        assert_eq!(end, now);
        assert_eq!((end - start).num_days(), 100);

        let (start, _) = history_window(OutputSize::Full, now);
        assert_eq!((now - start).num_days(), 5 * 365);
    }

    #[test]
    fn test_timestamp_to_date_is_utc() {
        // 2024-01-15T23:30:00Z
        assert_eq!(
            timestamp_to_date(1_705_361_400).unwrap().to_string(),
            "2024-01-15"
        );
    }

    #[tokio::test]
    async fn test_provider_metadata() {
        let provider = YahooProvider::new().await.unwrap();
        assert_eq!(provider.name(), "YAHOO");
        assert!(provider.enabled());
        assert!(provider.is_available());
        assert_eq!(provider.rate_limit_delay(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_bad_pair_fails_before_network() {
        let provider = YahooProvider::new().await.unwrap();
        let err = provider
            .fetch_current_quote("EURUS", AssetClass::Currency, "USD")
            .await
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[tokio::test]
    async fn test_empty_search_is_empty() {
        let provider = YahooProvider::new().await.unwrap();
        assert!(provider.search_symbols("  ").await.unwrap().is_empty());
    }
}
