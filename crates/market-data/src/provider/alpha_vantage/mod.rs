//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from Alpha Vantage API:
//! - Equities via GLOBAL_QUOTE and TIME_SERIES_DAILY endpoints
//! - FX rates via CURRENCY_EXCHANGE_RATE and FX_DAILY endpoints
//! - Cryptocurrencies via DIGITAL_CURRENCY_DAILY endpoint
//! - Symbol search via SYMBOL_SEARCH plus a cached crypto catalog
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute.

mod crypto_catalog;
mod models;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::errors::MarketDataError;
use crate::models::{
    compare_score_desc, dedup_by_symbol, AssetClass, CurrencyPair, HistoricalPricePoint,
    OutputSize, PriceQuote, SymbolSearchMatch,
};
use crate::provider::PriceProvider;

pub use crypto_catalog::{
    match_catalog, parse_catalog_csv, CatalogEntries, CatalogSource, CryptoCatalog,
    HttpCatalogSource, CATALOG_TTL, DEFAULT_CATALOG_URL, MAX_CRYPTO_MATCHES,
};

use models::{
    parse_date, parse_decimal, ApiSentinels, CryptoDailyResponse, DailyBar,
    ExchangeRateResponse, FxDailyResponse, GlobalQuoteResponse, SymbolSearchResponse,
    TimeSeriesResponse,
};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const DATA_SOURCE: &str = "Alpha Vantage";

/// Bars kept for a compact crypto history; the crypto endpoint has no
/// `outputsize` parameter.
const COMPACT_POINTS: usize = 100;

/// Phrases Alpha Vantage uses in "Note"/"Information" when throttling.
const THROTTLE_PHRASES: &[&str] = &[
    "call frequency",
    "rate limit",
    "requests per day",
    "calls per minute",
];

/// Licensing tier, which decides how fast we may call the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaVantagePlan {
    /// 5 calls per minute
    #[default]
    Free,
    /// 75+ calls per minute
    Premium,
}

impl AlphaVantagePlan {
    pub fn rate_limit_delay(&self) -> Duration {
        match self {
            Self::Free => Duration::from_secs(12),
            Self::Premium => Duration::from_millis(800),
        }
    }
}

impl FromStr for AlphaVantagePlan {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" | "slow" => Ok(Self::Free),
            "premium" | "fast" => Ok(Self::Premium),
            other => Err(MarketDataError::Configuration {
                provider: PROVIDER_ID.to_string(),
                message: format!("Unknown Alpha Vantage plan: {}", other),
            }),
        }
    }
}

impl fmt::Display for AlphaVantagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Premium => f.write_str("premium"),
        }
    }
}

/// Alpha Vantage market data provider.
///
/// Supports equities, FX rates, and cryptocurrencies.
/// Requires an API key; without one the provider reports itself unavailable.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    plan: AlphaVantagePlan,
    base_url: String,
    crypto_catalog: Arc<CryptoCatalog>,
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(api_key: String, plan: AlphaVantagePlan) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, api_key, plan)
    }

    /// Create a provider that shares an existing HTTP client.
    pub fn with_client(client: Client, api_key: String, plan: AlphaVantagePlan) -> Self {
        let source = HttpCatalogSource::new(client.clone(), DEFAULT_CATALOG_URL);
        Self {
            client,
            api_key,
            plan,
            base_url: BASE_URL.to_string(),
            crypto_catalog: Arc::new(CryptoCatalog::new(Arc::new(source))),
        }
    }

    /// Point the query endpoint somewhere else (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the crypto catalog.
    pub fn with_crypto_catalog(mut self, catalog: Arc<CryptoCatalog>) -> Self {
        self.crypto_catalog = catalog;
        self
    }

    pub fn plan(&self) -> AlphaVantagePlan {
        self.plan
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        if self.api_key.trim().is_empty() {
            return Err(MarketDataError::Configuration {
                provider: PROVIDER_ID.to_string(),
                message: "API key is not configured".to_string(),
            });
        }

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", self.api_key.as_str()));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::provider(PROVIDER_ID, format!("Failed to build URL: {}", e))
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                transport_error(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::rate_limited(PROVIDER_ID, "HTTP 429"));
        }

        if !status.is_success() {
            return Err(MarketDataError::provider(
                PROVIDER_ID,
                format!("HTTP {}", status),
            ));
        }

        response.text().await.map_err(transport_error)
    }

    /// Fetch, check sentinels, and deserialize the typed payload.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let text = self.fetch(params).await?;
        parse_response(&text)
    }

    async fn fetch_equity_quote(
        &self,
        symbol: &str,
    ) -> Result<Option<PriceQuote>, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let response: GlobalQuoteResponse = self.fetch_json(&params).await?;

        let Some(quote) = response.global_quote else {
            return Ok(None);
        };
        let Some(price) = quote.price.as_deref().and_then(parse_decimal) else {
            debug!("Alpha Vantage: empty GLOBAL_QUOTE for {}", symbol);
            return Ok(None);
        };
        let date = quote
            .latest_trading_day
            .as_deref()
            .and_then(parse_date)
            .unwrap_or_else(|| Utc::now().date_naive());

        Ok(Some(PriceQuote::new(symbol, price, date, PROVIDER_ID)))
    }

    async fn fetch_fx_quote(
        &self,
        symbol: &str,
        pair: &CurrencyPair,
    ) -> Result<Option<PriceQuote>, MarketDataError> {
        let params = [
            ("function", "CURRENCY_EXCHANGE_RATE"),
            ("from_currency", pair.from.as_str()),
            ("to_currency", pair.to.as_str()),
        ];
        let response: ExchangeRateResponse = self.fetch_json(&params).await?;

        let Some(rate) = response.rate else {
            return Ok(None);
        };
        let Some(price) = rate.exchange_rate.as_deref().and_then(parse_decimal) else {
            return Ok(None);
        };
        let date = rate
            .last_refreshed
            .as_deref()
            .and_then(parse_date)
            .unwrap_or_else(|| Utc::now().date_naive());

        Ok(Some(PriceQuote::new(symbol, price, date, PROVIDER_ID)))
    }

    /// Fetch equity bars using TIME_SERIES_DAILY endpoint.
    async fn fetch_equity_series(
        &self,
        symbol: &str,
        currency: &str,
        size: OutputSize,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
        let params = [
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", symbol),
            ("outputsize", size.as_str()),
        ];
        let response: TimeSeriesResponse = self.fetch_json(&params).await?;

        let points = daily_points(
            response.time_series.unwrap_or_default(),
            symbol,
            AssetClass::Stock,
            currency,
        );

        debug!(
            "Alpha Vantage: fetched {} equity bars for {}",
            points.len(),
            symbol
        );
        Ok(points)
    }

    /// Fetch FX bars using FX_DAILY endpoint.
    async fn fetch_fx_series(
        &self,
        symbol: &str,
        pair: &CurrencyPair,
        size: OutputSize,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
        let params = [
            ("function", "FX_DAILY"),
            ("from_symbol", pair.from.as_str()),
            ("to_symbol", pair.to.as_str()),
            ("outputsize", size.as_str()),
        ];
        let response: FxDailyResponse = self.fetch_json(&params).await?;

        let mut points: Vec<HistoricalPricePoint> = response
            .time_series
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(date_str, bar)| {
                let date = parse_date(&date_str)?;
                let close = parse_decimal(&bar.close)?;
                let point = HistoricalPricePoint::new(
                    symbol,
                    date,
                    close,
                    AssetClass::Currency,
                    pair.to.as_str(),
                );
                Some(
                    point
                        .with_ohl(
                            parse_decimal(&bar.open),
                            parse_decimal(&bar.high),
                            parse_decimal(&bar.low),
                        )
                        .with_source(DATA_SOURCE, PROVIDER_ID),
                )
            })
            .collect();

        // Sort by date ascending
        points.sort_by(|a, b| a.date.cmp(&b.date));

        debug!(
            "Alpha Vantage: fetched {} FX bars for {}",
            points.len(),
            pair
        );
        Ok(points)
    }

    /// Fetch crypto bars using DIGITAL_CURRENCY_DAILY endpoint.
    async fn fetch_crypto_series(
        &self,
        symbol: &str,
        market: &str,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
        let params = [
            ("function", "DIGITAL_CURRENCY_DAILY"),
            ("symbol", symbol),
            ("market", market),
        ];
        let response: CryptoDailyResponse = self.fetch_json(&params).await?;

        let mut points: Vec<HistoricalPricePoint> = response
            .time_series
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(date_str, bar)| {
                let date = parse_date(&date_str)?;
                let close = bar.close()?;
                Some(
                    HistoricalPricePoint::new(symbol, date, close, AssetClass::Crypto, market)
                        .with_ohl(bar.open(), bar.high(), bar.low())
                        .with_volume(bar.volume())
                        .with_source(DATA_SOURCE, PROVIDER_ID),
                )
            })
            .collect();

        // Sort by date ascending
        points.sort_by(|a, b| a.date.cmp(&b.date));

        debug!(
            "Alpha Vantage: fetched {} crypto bars for {}/{}",
            points.len(),
            symbol,
            market
        );
        Ok(points)
    }

    /// Equity/ETF matches from SYMBOL_SEARCH.
    async fn search_equities(
        &self,
        keywords: &str,
    ) -> Result<Vec<SymbolSearchMatch>, MarketDataError> {
        let params = [("function", "SYMBOL_SEARCH"), ("keywords", keywords)];
        let response: SymbolSearchResponse = self.fetch_json(&params).await?;

        Ok(response
            .best_matches
            .unwrap_or_default()
            .into_iter()
            .filter(|m| !m.symbol.is_empty())
            .map(|m| {
                let mut result = SymbolSearchMatch::new(m.symbol, m.name, m.asset_type, PROVIDER_ID)
                    .with_region(m.region)
                    .with_session(m.market_open, m.market_close, m.timezone)
                    .with_currency(m.currency);
                result.match_score = m.match_score;
                result
            })
            .collect())
    }
}

/// Check the sentinel fields, then deserialize the payload.
/// The request URL carries the API key and symbol, so it never goes into the
/// message; a "429" inside either would otherwise read as a rate limit.
fn transport_error(e: reqwest::Error) -> MarketDataError {
    MarketDataError::provider(PROVIDER_ID, e.without_url().to_string())
}

fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T, MarketDataError> {
    let sentinels: ApiSentinels = serde_json::from_str(text).map_err(|e| {
        MarketDataError::provider(PROVIDER_ID, format!("Failed to parse response: {}", e))
    })?;
    check_api_error(&sentinels)?;

    serde_json::from_str(text).map_err(|e| {
        MarketDataError::provider(PROVIDER_ID, format!("Failed to parse response: {}", e))
    })
}

/// Check for API-level errors in an HTTP 200 body.
fn check_api_error(sentinels: &ApiSentinels) -> Result<(), MarketDataError> {
    if let Some(ref msg) = sentinels.error_message {
        return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
    }

    // "Note" usually indicates rate limiting
    if let Some(ref msg) = sentinels.note {
        if is_throttle_notice(msg) {
            return Err(MarketDataError::rate_limited(PROVIDER_ID, msg.clone()));
        }
        warn!("Alpha Vantage note: {}", msg);
    }

    // "Information" is either the daily limit or a premium/demo key notice
    if let Some(ref msg) = sentinels.information {
        if is_throttle_notice(msg) {
            return Err(MarketDataError::rate_limited(PROVIDER_ID, msg.clone()));
        }
        return Err(MarketDataError::provider(PROVIDER_ID, msg.clone()));
    }

    Ok(())
}

fn is_throttle_notice(message: &str) -> bool {
    let lower = message.to_lowercase();
    THROTTLE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn daily_points(
    series: HashMap<String, DailyBar>,
    symbol: &str,
    asset_class: AssetClass,
    currency: &str,
) -> Vec<HistoricalPricePoint> {
    let mut points: Vec<HistoricalPricePoint> = series
        .into_iter()
        .filter_map(|(date_str, bar)| {
            let date = parse_date(&date_str)?;
            let close = parse_decimal(&bar.close)?;
            Some(
                HistoricalPricePoint::new(symbol, date, close, asset_class, currency)
                    .with_ohl(
                        parse_decimal(&bar.open),
                        parse_decimal(&bar.high),
                        parse_decimal(&bar.low),
                    )
                    .with_volume(bar.volume.as_deref().and_then(parse_decimal))
                    .with_adjusted_close(bar.adjusted_close.as_deref().and_then(parse_decimal))
                    .with_source(DATA_SOURCE, PROVIDER_ID),
            )
        })
        .collect();

    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

/// Merge crypto and equity matches.
///
/// Dedup by symbol (first occurrence kept, crypto first), then order:
/// exact symbol match, crypto before equity, descending score.
fn rank_search_results(
    keyword: &str,
    crypto: Vec<SymbolSearchMatch>,
    equity: Vec<SymbolSearchMatch>,
) -> Vec<SymbolSearchMatch> {
    let crypto_symbols: HashSet<String> = crypto.iter().map(|m| m.symbol.clone()).collect();

    let keyword = keyword.trim();
    let mut merged = dedup_by_symbol(crypto.into_iter().chain(equity).collect());
    merged.sort_by(|a, b| {
        let exact_a = a.symbol.eq_ignore_ascii_case(keyword);
        let exact_b = b.symbol.eq_ignore_ascii_case(keyword);
        let crypto_a = crypto_symbols.contains(&a.symbol);
        let crypto_b = crypto_symbols.contains(&b.symbol);
        exact_b
            .cmp(&exact_a)
            .then(crypto_b.cmp(&crypto_a))
            .then_with(|| compare_score_desc(a, b))
    });
    merged
}

// ============================================================================
// PriceProvider trait implementation
// ============================================================================

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        PROVIDER_ID
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn rate_limit_delay(&self) -> Duration {
        self.plan.rate_limit_delay()
    }

    async fn fetch_current_quote(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
    ) -> Result<Option<PriceQuote>, MarketDataError> {
        match asset_class {
            AssetClass::Stock => self.fetch_equity_quote(symbol).await,
            AssetClass::Currency => {
                let pair = CurrencyPair::parse(symbol)?;
                self.fetch_fx_quote(symbol, &pair).await
            }
            AssetClass::Crypto => {
                // The most recent daily close doubles as the current price
                let points = self.fetch_crypto_series(symbol, currency).await?;
                Ok(points
                    .last()
                    .map(|p| PriceQuote::new(symbol, p.close, p.date, PROVIDER_ID)))
            }
        }
    }

    async fn fetch_historical_prices(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
        size: OutputSize,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
        match asset_class {
            AssetClass::Stock => self.fetch_equity_series(symbol, currency, size).await,
            AssetClass::Currency => {
                let pair = CurrencyPair::parse(symbol)?;
                self.fetch_fx_series(symbol, &pair, size).await
            }
            AssetClass::Crypto => {
                let mut points = self.fetch_crypto_series(symbol, currency).await?;
                if size == OutputSize::Compact && points.len() > COMPACT_POINTS {
                    points.drain(..points.len() - COMPACT_POINTS);
                }
                Ok(points)
            }
        }
    }

    async fn search_symbols(
        &self,
        keywords: &str,
    ) -> Result<Vec<SymbolSearchMatch>, MarketDataError> {
        let keyword = keywords.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let catalog = self.crypto_catalog.entries().await;
        let crypto = match_catalog(&catalog, keyword, PROVIDER_ID);

        let equity = match self.search_equities(keyword).await {
            Ok(matches) => matches,
            Err(e) if !crypto.is_empty() => {
                warn!(
                    "Alpha Vantage: equity search failed for '{}', \
                     returning crypto matches only: {}",
                    keyword, e
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        Ok(rank_search_results(keyword, crypto, equity))
    }
}
