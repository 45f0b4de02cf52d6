//! Provider registry module.
//!
//! This module provides orchestration for market data providers, including:
//! - Provider registration and priority ordering
//! - Failover with per-provider pacing delays
//! - Cross-provider search merging and batch quotes
//! - Provider stats and an advisory market-hours check

mod diagnostics;
mod market_hours;
mod registry;
mod stats;

pub use diagnostics::{AttemptOutcome, FetchDiagnostics, ProviderAttempt, SkipReason};
pub use market_hours::{is_market_hours_at, MARKET_CLOSE_HOUR_UTC, MARKET_OPEN_HOUR_UTC};
pub use registry::ProviderRegistry;
pub use stats::ProviderStats;
