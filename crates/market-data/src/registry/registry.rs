//! Provider registry for orchestrating market data providers.
//!
//! The registry walks its providers in registration order, handling:
//! - Skipping disabled or unavailable providers
//! - Failover to the next provider on error, after the failed provider's delay
//! - Distinguishing "every provider throttled us" from other failures
//! - Merging search results across providers
//! - Pacing batch requests

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::diagnostics::{FetchDiagnostics, SkipReason};
use super::market_hours;
use super::stats::ProviderStats;
use crate::config::MarketDataConfig;
use crate::errors::{FailureClass, MarketDataError};
use crate::models::{
    compare_score_desc, dedup_by_symbol, AssetClass, HistoricalPricePoint, OutputSize,
    PriceQuote, QuoteRequest, SymbolSearchMatch,
};
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::PriceProvider;

/// Provider registry for orchestrating market data fetching.
///
/// Calls are strictly sequential: one provider call or one pacing sleep is in
/// flight at a time.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn PriceProvider>>,
}

impl ProviderRegistry {
    /// Create a registry over providers in priority order.
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>) -> Self {
        Self { providers }
    }

    /// Build the default chain: Alpha Vantage first, Yahoo as fallback.
    pub async fn from_config(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| MarketDataError::Configuration {
                provider: "ALPHA_VANTAGE".to_string(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let alpha_vantage = AlphaVantageProvider::with_client(
            client,
            config.alpha_vantage_api_key.clone().unwrap_or_default(),
            config.alpha_vantage_plan,
        );
        if !alpha_vantage.is_available() {
            info!("ALPHA_VANTAGE has no API key configured, it will be skipped");
        }

        let yahoo = YahooProvider::new().await?;

        Ok(Self::new(vec![Arc::new(alpha_vantage), Arc::new(yahoo)]))
    }

    /// Append a provider at the lowest priority.
    pub fn add_provider(&mut self, provider: Arc<dyn PriceProvider>) {
        self.providers.push(provider);
    }

    /// Remove every provider with this name. Returns whether any was removed.
    pub fn remove_provider(&mut self, name: &str) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| p.name() != name);
        self.providers.len() != before
    }

    /// All registered providers in priority order.
    pub fn providers(&self) -> &[Arc<dyn PriceProvider>] {
        &self.providers
    }

    /// Providers that are both enabled and available right now.
    pub fn available_providers(&self) -> Vec<Arc<dyn PriceProvider>> {
        self.providers
            .iter()
            .filter(|p| p.enabled() && p.is_available())
            .cloned()
            .collect()
    }

    /// Fetch the latest quote, failing over across providers.
    ///
    /// Returns `Ok(None)` when every provider answered without a quote.
    /// Errors:
    /// - [`MarketDataError::InvalidFormat`] as soon as a provider rejects the input
    /// - [`MarketDataError::AllProvidersRateLimited`] when every failure was a rate limit
    /// - otherwise the first provider error recorded
    pub async fn fetch_current_quote(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
    ) -> Result<Option<PriceQuote>, MarketDataError> {
        let winner = self
            .run_waterfall(symbol, "quote", move |provider| async move {
                provider
                    .fetch_current_quote(symbol, asset_class, currency)
                    .await
            })
            .await?;

        Ok(winner.map(|(quote, _)| quote))
    }

    /// Fetch daily history, failing over across providers.
    ///
    /// An empty list from a provider counts as "no data" and moves on to the
    /// next one. Every point of the winning list is tagged with the winner.
    pub async fn fetch_historical_prices(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        currency: &str,
        size: OutputSize,
    ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
        let winner = self
            .run_waterfall(symbol, "history", move |provider| async move {
                provider
                    .fetch_historical_prices(symbol, asset_class, currency, size)
                    .await
                    .map(|points| (!points.is_empty()).then_some(points))
            })
            .await?;

        Ok(match winner {
            Some((mut points, provider)) => {
                for point in &mut points {
                    point.provider = provider.to_string();
                }
                points
            }
            None => Vec::new(),
        })
    }

    /// Search every available provider and merge the results.
    ///
    /// Duplicates keep the copy from the earliest provider; the merged list
    /// is ordered by descending score. Provider failures are logged, never
    /// returned.
    pub async fn search_symbols(&self, keywords: &str) -> Vec<SymbolSearchMatch> {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut all_matches = Vec::new();

        for provider in self.available_providers() {
            match provider.search_symbols(keywords).await {
                Ok(matches) => {
                    debug!(
                        "Provider '{}' returned {} matches for '{}'",
                        provider.name(),
                        matches.len(),
                        keywords
                    );
                    all_matches.extend(matches);
                }
                Err(e) => {
                    warn!(
                        "Search failed on provider '{}' for '{}': {}",
                        provider.name(),
                        keywords,
                        e
                    );
                }
            }

            tokio::time::sleep(provider.rate_limit_delay()).await;
        }

        let mut merged = dedup_by_symbol(all_matches);
        merged.sort_by(compare_score_desc);
        merged
    }

    /// Fetch quotes for several symbols, one after another.
    ///
    /// Symbols without a quote, or whose fetch failed, are left out of the
    /// map. Between consecutive symbols the registry waits the delay of the
    /// first available provider.
    pub async fn fetch_multiple_quotes(
        &self,
        requests: &[QuoteRequest],
    ) -> HashMap<String, PriceQuote> {
        let mut quotes = HashMap::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            if index > 0 {
                if let Some(delay) = self.pacing_delay() {
                    tokio::time::sleep(delay).await;
                }
            }

            match self
                .fetch_current_quote(&request.symbol, request.asset_class, &request.currency)
                .await
            {
                Ok(Some(quote)) => {
                    quotes.insert(request.symbol.clone(), quote);
                }
                Ok(None) => {
                    warn!("No quote available for '{}', skipping", request.symbol);
                }
                Err(e) => {
                    warn!("Failed to fetch quote for '{}': {}", request.symbol, e);
                }
            }
        }

        info!(
            "Batch fetched {} of {} quotes",
            quotes.len(),
            requests.len()
        );
        quotes
    }

    /// Whether US equity markets are open now. Advisory only.
    pub fn is_market_hours(&self) -> bool {
        market_hours::is_market_hours_at(Utc::now())
    }

    /// Whether US equity markets are open at `at`.
    pub fn is_market_hours_at(&self, at: DateTime<Utc>) -> bool {
        market_hours::is_market_hours_at(at)
    }

    /// One entry per registered provider, available or not.
    pub fn get_provider_stats(&self) -> Vec<ProviderStats> {
        self.providers
            .iter()
            .map(|p| ProviderStats::from_provider(p.as_ref()))
            .collect()
    }

    fn pacing_delay(&self) -> Option<Duration> {
        self.providers
            .iter()
            .find(|p| p.enabled() && p.is_available())
            .map(|p| p.rate_limit_delay())
    }

    /// Ask providers in order until one returns data.
    ///
    /// `Ok(None)` from `call` means "no data here, try the next provider"
    /// without a delay. Errors wait out the failed provider's delay before the
    /// next provider is tried.
    async fn run_waterfall<T, F, Fut>(
        &self,
        symbol: &str,
        operation: &str,
        mut call: F,
    ) -> Result<Option<(T, &'static str)>, MarketDataError>
    where
        F: FnMut(Arc<dyn PriceProvider>) -> Fut,
        Fut: Future<Output = Result<Option<T>, MarketDataError>>,
    {
        let mut diagnostics = FetchDiagnostics::new();
        let mut candidates: Vec<&Arc<dyn PriceProvider>> = Vec::new();

        for provider in &self.providers {
            if !provider.enabled() {
                diagnostics.record_skip(provider.name(), SkipReason::Disabled);
            } else if !provider.is_available() {
                diagnostics.record_skip(provider.name(), SkipReason::Unavailable);
            } else {
                candidates.push(provider);
            }
        }

        if candidates.is_empty() {
            warn!(
                "No providers available for {} of '{}' ({})",
                operation,
                symbol,
                diagnostics.summary()
            );
            return Ok(None);
        }

        let mut first_error: Option<MarketDataError> = None;
        let last_index = candidates.len() - 1;

        for (index, provider) in candidates.into_iter().enumerate() {
            let name = provider.name();
            debug!("Fetching {} for '{}' from provider '{}'", operation, symbol, name);

            match call(Arc::clone(provider)).await {
                Ok(Some(value)) => {
                    diagnostics.record_success(name);
                    debug!("{} for '{}': {}", operation, symbol, diagnostics.summary());
                    return Ok(Some((value, name)));
                }
                Ok(None) => {
                    debug!("Provider '{}' has no {} for '{}'", name, operation, symbol);
                    diagnostics.record_empty(name);
                }
                Err(e) => {
                    let class = e.failure_class();
                    if class == FailureClass::Abort {
                        info!(
                            "Provider '{}' rejected '{}': {}, not trying other providers",
                            name, symbol, e
                        );
                        return Err(e);
                    }

                    warn!(
                        "Provider '{}' failed {} for '{}' ({:?}): {}",
                        name, operation, symbol, class, e
                    );
                    diagnostics.record_error(name, class, e.to_string());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }

                    if index < last_index {
                        tokio::time::sleep(provider.rate_limit_delay()).await;
                    }
                }
            }
        }

        debug!("{} for '{}': {}", operation, symbol, diagnostics.summary());

        if diagnostics.all_failures_rate_limited() {
            return Err(MarketDataError::AllProvidersRateLimited {
                symbol: symbol.to_string(),
            });
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockProvider {
        name: &'static str,
        available: bool,
        delay: Duration,
        call_count: AtomicUsize,
        error: Option<&'static str>,
    }

    impl MockProvider {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                available: true,
                delay: Duration::ZERO,
                call_count: AtomicUsize::new(0),
                error: None,
            }
        }

        fn failing(name: &'static str, message: &'static str) -> Self {
            Self {
                error: Some(message),
                ..Self::new(name)
            }
        }

        fn unavailable(name: &'static str) -> Self {
            Self {
                available: false,
                ..Self::new(name)
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn result<T>(&self, value: T) -> Result<T, MarketDataError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.error {
                Some(message) => Err(MarketDataError::provider(self.name, message)),
                None => Ok(value),
            }
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[async_trait]
    impl PriceProvider for MockProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn rate_limit_delay(&self) -> Duration {
            self.delay
        }

        async fn fetch_current_quote(
            &self,
            symbol: &str,
            _asset_class: AssetClass,
            _currency: &str,
        ) -> Result<Option<PriceQuote>, MarketDataError> {
            self.result(Some(PriceQuote::new(symbol, dec!(102), day(), self.name)))
        }

        async fn fetch_historical_prices(
            &self,
            symbol: &str,
            asset_class: AssetClass,
            currency: &str,
            _size: OutputSize,
        ) -> Result<Vec<HistoricalPricePoint>, MarketDataError> {
            self.result(vec![HistoricalPricePoint::new(
                symbol,
                day(),
                dec!(102),
                asset_class,
                currency,
            )])
        }

        async fn search_symbols(
            &self,
            keywords: &str,
        ) -> Result<Vec<SymbolSearchMatch>, MarketDataError> {
            self.result(vec![SymbolSearchMatch::new(keywords, keywords, "Equity", self.name)])
        }
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let first = Arc::new(MockProvider::new("FIRST"));
        let second = Arc::new(MockProvider::new("SECOND"));
        let registry = ProviderRegistry::new(vec![first.clone(), second.clone()]);

        let quote = registry
            .fetch_current_quote("AAPL", AssetClass::Stock, "USD")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(quote.provider, "FIRST");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_skipped() {
        let first = Arc::new(MockProvider::unavailable("FIRST"));
        let second = Arc::new(MockProvider::new("SECOND"));
        let registry = ProviderRegistry::new(vec![first.clone(), second]);

        let quote = registry
            .fetch_current_quote("AAPL", AssetClass::Stock, "USD")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(quote.provider, "SECOND");
        assert_eq!(first.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_available_providers_is_absent() {
        let registry = ProviderRegistry::new(vec![Arc::new(MockProvider::unavailable("ONLY"))]);
        let quote = registry
            .fetch_current_quote("AAPL", AssetClass::Stock, "USD")
            .await
            .unwrap();
        assert!(quote.is_none());
    }

    #[tokio::test]
    async fn test_first_error_is_returned_when_all_fail() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::failing("FIRST", "HTTP 500")),
            Arc::new(MockProvider::failing("SECOND", "HTTP 502")),
        ]);

        let err = registry
            .fetch_current_quote("AAPL", AssetClass::Stock, "USD")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FIRST"), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_history_is_tagged_with_winner() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::failing("FIRST", "HTTP 500")),
            Arc::new(MockProvider::new("SECOND")),
        ]);

        let points = registry
            .fetch_historical_prices("AAPL", AssetClass::Stock, "USD", OutputSize::Compact)
            .await
            .unwrap();

        assert_eq!(points.len(), 1);
        assert!(points.iter().all(|p| p.provider == "SECOND"));
    }

    #[test]
    fn test_add_and_remove_providers() {
        let mut registry = ProviderRegistry::default();
        registry.add_provider(Arc::new(MockProvider::new("FIRST")));
        registry.add_provider(Arc::new(MockProvider::unavailable("SECOND")));

        assert_eq!(registry.providers().len(), 2);
        assert_eq!(registry.available_providers().len(), 1);

        assert!(registry.remove_provider("FIRST"));
        assert!(!registry.remove_provider("FIRST"));
        assert_eq!(registry.providers()[0].name(), "SECOND");
    }

    #[test]
    fn test_stats_include_unavailable_providers() {
        let registry = ProviderRegistry::new(vec![
            Arc::new(MockProvider::new("FIRST")),
            Arc::new(MockProvider::unavailable("SECOND")),
        ]);

        let stats = registry.get_provider_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].name, "SECOND");
        assert!(stats[1].enabled);
        assert!(!stats[1].available);
    }

    #[tokio::test]
    async fn test_empty_search_calls_nobody() {
        let provider = Arc::new(MockProvider::new("FIRST"));
        let registry = ProviderRegistry::new(vec![provider.clone()]);

        assert!(registry.search_symbols("   ").await.is_empty());
        assert_eq!(provider.calls(), 0);
    }
}
