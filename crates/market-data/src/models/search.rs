//! Search result models for symbol lookup.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Result from a ticker/symbol search.
///
/// Field names follow the wire vocabulary of symbol search APIs. Fields a
/// provider does not report are left as empty strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSearchMatch {
    /// Symbol/ticker (e.g., "AAPL", "BTC")
    pub symbol: String,

    /// Display name (e.g., "Apple Inc")
    pub name: String,

    /// Asset type label (e.g., "Equity", "ETF", "Cryptocurrency")
    #[serde(rename = "type")]
    pub asset_type: String,

    /// Region or exchange (e.g., "United States")
    pub region: String,

    pub market_open: String,

    pub market_close: String,

    pub timezone: String,

    pub currency: String,

    /// Relevance score as decimal text (e.g., "0.8000"). Compare with
    /// [`score`](Self::score), never lexically.
    pub match_score: String,

    pub provider: String,
}

impl SymbolSearchMatch {
    /// Create a match with required fields; the rest start empty.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        asset_type: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            asset_type: asset_type.into(),
            region: String::new(),
            market_open: String::new(),
            market_close: String::new(),
            timezone: String::new(),
            currency: String::new(),
            match_score: String::new(),
            provider: provider.into(),
        }
    }

    /// Set region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set market session and timezone.
    pub fn with_session(
        mut self,
        market_open: impl Into<String>,
        market_close: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        self.market_open = market_open.into();
        self.market_close = market_close.into();
        self.timezone = timezone.into();
        self
    }

    /// Set the currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the relevance score, rendered with four decimals.
    pub fn with_score(mut self, score: f64) -> Self {
        self.match_score = format_score(score);
        self
    }

    /// Numeric value of `match_score`. Unparsable scores rank last.
    pub fn score(&self) -> f64 {
        self.match_score
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
    }
}

/// Render a score the way search APIs transmit it ("0.9000").
pub fn format_score(score: f64) -> String {
    format!("{:.4}", score)
}

/// Keep the first match for each symbol, preserving order.
pub fn dedup_by_symbol(matches: Vec<SymbolSearchMatch>) -> Vec<SymbolSearchMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.symbol.clone()))
        .collect()
}

/// Descending numeric score. Stable, so equal scores keep their order.
pub fn compare_score_desc(a: &SymbolSearchMatch, b: &SymbolSearchMatch) -> Ordering {
    b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal)
}
