//! Cached catalog of cryptocurrency symbols used for search.
//!
//! The catalog is a plaintext CSV (`code,name` per line, optional header row)
//! cached for 24 hours. Refresh failures never surface: a stale catalog is
//! served if one exists, otherwise a small built-in list.
//! After a failed refresh the stale copy is kept for a short back-off so an
//! outage costs one fetch attempt per interval rather than one per search.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::MarketDataError;
use crate::models::{compare_score_desc, SymbolSearchMatch};

/// Alpha Vantage's digital currency listing.
pub const DEFAULT_CATALOG_URL: &str = "https://www.alphavantage.co/digital_currency_list/";

/// How long a fetched catalog stays fresh.
pub const CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// After a failed refresh, the stale catalog is served this long before the
/// next attempt.
pub const REFRESH_RETRY_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Upper bound on crypto matches contributed to one search.
pub const MAX_CRYPTO_MATCHES: usize = 10;

const EXACT_SYMBOL_SCORE: f64 = 1.0;
const SYMBOL_CONTAINS_SCORE: f64 = 0.9;
const NAME_CONTAINS_SCORE: f64 = 0.8;

/// Served when the catalog has never been fetched successfully.
const FALLBACK_CATALOG: &[(&str, &str)] = &[
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("USDT", "Tether"),
    ("BNB", "Binance Coin"),
    ("SOL", "Solana"),
    ("XRP", "Ripple"),
    ("USDC", "USD Coin"),
    ("ADA", "Cardano"),
    ("DOGE", "Dogecoin"),
    ("LTC", "Litecoin"),
];

/// Symbol to display name.
pub type CatalogEntries = BTreeMap<String, String>;

/// Where the raw catalog CSV comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_csv(&self) -> Result<String, MarketDataError>;
}

/// Fetches the catalog over HTTP.
pub struct HttpCatalogSource {
    client: Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_csv(&self) -> Result<String, MarketDataError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::provider(
                super::PROVIDER_ID,
                format!("Crypto catalog HTTP {}", status),
            ));
        }

        Ok(response.text().await?)
    }
}

struct CatalogSnapshot {
    entries: Arc<CatalogEntries>,
    expires_at: Instant,
}

/// TTL cache over a [`CatalogSource`].
///
/// The lock is held across a refresh, so concurrent searches wait for one
/// fetch instead of issuing their own.
pub struct CryptoCatalog {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    state: Mutex<Option<CatalogSnapshot>>,
}

impl CryptoCatalog {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self::with_ttl(source, CATALOG_TTL)
    }

    pub fn with_ttl(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Current catalog entries, refreshing first if missing or expired.
    pub async fn entries(&self) -> Arc<CatalogEntries> {
        let mut state = self.state.lock().await;

        if let Some(snapshot) = state.as_ref() {
            if Instant::now() < snapshot.expires_at {
                return Arc::clone(&snapshot.entries);
            }
            debug!("Crypto catalog expired, refreshing");
        }

        match self.refresh().await {
            Ok(entries) => {
                debug!("Crypto catalog refreshed with {} symbols", entries.len());
                let entries = Arc::new(entries);
                *state = Some(CatalogSnapshot {
                    entries: Arc::clone(&entries),
                    expires_at: Instant::now() + self.ttl,
                });
                entries
            }
            Err(e) => match state.as_mut() {
                Some(snapshot) => {
                    warn!("Crypto catalog refresh failed, serving stale catalog: {}", e);
                    snapshot.expires_at = Instant::now() + REFRESH_RETRY_BACKOFF.min(self.ttl);
                    Arc::clone(&snapshot.entries)
                }
                None => {
                    warn!("Crypto catalog unavailable, serving built-in list: {}", e);
                    Arc::new(fallback_entries())
                }
            },
        }
    }

    async fn refresh(&self) -> Result<CatalogEntries, MarketDataError> {
        let csv = self.source.fetch_csv().await?;
        let entries = parse_catalog_csv(&csv);
        if entries.is_empty() {
            return Err(MarketDataError::provider(
                super::PROVIDER_ID,
                "Crypto catalog is empty",
            ));
        }
        Ok(entries)
    }
}

/// Parse `code,name` lines. A header row ("currency code,currency name") is skipped.
pub fn parse_catalog_csv(csv: &str) -> CatalogEntries {
    let mut entries = CatalogEntries::new();

    for (index, line) in csv.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((code, name)) = line.split_once(',') else {
            continue;
        };
        let code = code.trim().trim_matches('"');
        let name = name.trim().trim_matches('"');

        if index == 0 && is_header(code) {
            continue;
        }
        if code.is_empty() {
            continue;
        }

        entries
            .entry(code.to_uppercase())
            .or_insert_with(|| name.to_string());
    }

    entries
}

fn is_header(first_column: &str) -> bool {
    matches!(
        first_column.to_lowercase().as_str(),
        "currency code" | "code" | "symbol"
    )
}

fn fallback_entries() -> CatalogEntries {
    FALLBACK_CATALOG
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect()
}

/// Score catalog entries against a keyword.
///
/// 1.0 for an exact symbol match, 0.9 when the symbol contains the keyword,
/// 0.8 when the name does. Best matches first, capped at [`MAX_CRYPTO_MATCHES`].
pub fn match_catalog(
    entries: &CatalogEntries,
    keyword: &str,
    provider: &str,
) -> Vec<SymbolSearchMatch> {
    let upper = keyword.trim().to_uppercase();
    let lower = keyword.trim().to_lowercase();
    if upper.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<SymbolSearchMatch> = entries
        .iter()
        .filter_map(|(symbol, name)| {
            let score = if *symbol == upper {
                EXACT_SYMBOL_SCORE
            } else if symbol.contains(&upper) {
                SYMBOL_CONTAINS_SCORE
            } else if name.to_lowercase().contains(&lower) {
                NAME_CONTAINS_SCORE
            } else {
                return None;
            };

            Some(
                SymbolSearchMatch::new(symbol.as_str(), name.as_str(), "Cryptocurrency", provider)
                    .with_region("Global")
                    .with_session("00:00", "23:59", "UTC")
                    .with_currency("USD")
                    .with_score(score),
            )
        })
        .collect();

    matches.sort_by(compare_score_desc);
    matches.truncate(MAX_CRYPTO_MATCHES);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const CSV: &str =
        "currency code,currency name\nBTC,Bitcoin\nETH,Ethereum\nWBTC,Wrapped Bitcoin\n";

    struct MockSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        body: &'static str,
    }

    impl MockSource {
        fn new(body: &'static str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                body,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for MockSource {
        async fn fetch_csv(&self) -> Result<String, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(MarketDataError::provider("ALPHA_VANTAGE", "catalog down"))
            } else {
                Ok(self.body.to_string())
            }
        }
    }

    #[test]
    fn test_parse_with_header() {
        let entries = parse_catalog_csv(CSV);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.get("BTC").map(String::as_str), Some("Bitcoin"));
        assert!(!entries.contains_key("CURRENCY CODE"));
    }

    #[test]
    fn test_parse_without_header_and_blank_lines() {
        let entries = parse_catalog_csv("btc,Bitcoin\n\n  eth , Ethereum \nbroken-line\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("ETH").map(String::as_str), Some("Ethereum"));
    }

    #[test]
    fn test_match_scores() {
        let entries = parse_catalog_csv(CSV);

        let matches = match_catalog(&entries, "btc", "ALPHA_VANTAGE");
        let symbols: Vec<_> = matches.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "WBTC"]);
        assert_eq!(matches[0].match_score, "1.0000");
        assert_eq!(matches[1].match_score, "0.9000");

        let matches = match_catalog(&entries, "ether", "ALPHA_VANTAGE");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].symbol, "ETH");
        assert_eq!(matches[0].match_score, "0.8000");
        assert_eq!(matches[0].asset_type, "Cryptocurrency");
    }

    #[test]
    fn test_match_is_capped() {
        let csv: String = (0..30).map(|i| format!("COIN{},Coin {}\n", i, i)).collect();
        let entries = parse_catalog_csv(&csv);
        assert_eq!(match_catalog(&entries, "coin", "ALPHA_VANTAGE").len(), MAX_CRYPTO_MATCHES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_search_within_ttl_uses_cache() {
        let source = Arc::new(MockSource::new(CSV));
        let catalog = CryptoCatalog::new(source.clone());

        let first = catalog.entries().await;
        tokio::time::advance(Duration::from_secs(60 * 60)).await;
        let second = catalog.entries().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(first.len(), second.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_catalog_with_failing_refresh_serves_stale() {
        let source = Arc::new(MockSource::new(CSV));
        let catalog = CryptoCatalog::new(source.clone());

        assert!(catalog.entries().await.contains_key("WBTC"));

        source.fail.store(true, Ordering::SeqCst);
        tokio::time::advance(CATALOG_TTL + Duration::from_secs(1)).await;

        let entries = catalog.entries().await;
        assert_eq!(source.calls(), 2);
        assert!(entries.contains_key("WBTC"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_backs_off_before_retrying() {
        let source = Arc::new(MockSource::new(CSV));
        let catalog = CryptoCatalog::new(source.clone());
        catalog.entries().await;

        source.fail.store(true, Ordering::SeqCst);
        tokio::time::advance(CATALOG_TTL + Duration::from_secs(1)).await;
        catalog.entries().await;
        assert_eq!(source.calls(), 2);

        // Searches during the back-off are served stale without a fetch
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(catalog.entries().await.contains_key("WBTC"));
        assert_eq!(source.calls(), 2);

        source.fail.store(false, Ordering::SeqCst);
        tokio::time::advance(REFRESH_RETRY_BACKOFF).await;
        assert!(catalog.entries().await.contains_key("WBTC"));
        assert_eq!(source.calls(), 3);

        // A successful refresh restores the full TTL
        tokio::time::advance(REFRESH_RETRY_BACKOFF * 2).await;
        catalog.entries().await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_cold_start_failure_serves_fallback() {
        let source = Arc::new(MockSource::new(CSV));
        source.fail.store(true, Ordering::SeqCst);
        let catalog = CryptoCatalog::new(source.clone());

        let entries = catalog.entries().await;
        assert!(entries.contains_key("BTC"));
        assert!(!entries.contains_key("WBTC"));

        // Fallback is not cached, so the next search retries the source
        source.fail.store(false, Ordering::SeqCst);
        let entries = catalog.entries().await;
        assert!(entries.contains_key("WBTC"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_catalog_counts_as_failure() {
        let source = Arc::new(MockSource::new("currency code,currency name\n"));
        let catalog = CryptoCatalog::new(source);
        let entries = catalog.entries().await;
        assert_eq!(entries.len(), FALLBACK_CATALOG.len());
    }
}
