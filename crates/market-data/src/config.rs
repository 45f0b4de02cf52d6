//! Environment-driven configuration for the default provider chain.

use std::time::Duration;

use crate::errors::MarketDataError;
use crate::provider::alpha_vantage::AlphaVantagePlan;

pub const ENV_ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const ENV_ALPHA_VANTAGE_PLAN: &str = "ALPHA_VANTAGE_PLAN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "MARKET_DATA_HTTP_TIMEOUT_SECS";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketDataConfig {
    /// `None` leaves Alpha Vantage registered but unavailable.
    pub alpha_vantage_api_key: Option<String>,
    pub alpha_vantage_plan: AlphaVantagePlan,
    pub http_timeout: Duration,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: None,
            alpha_vantage_plan: AlphaVantagePlan::Free,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl MarketDataConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, MarketDataError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MarketDataError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let alpha_vantage_api_key = lookup(ENV_ALPHA_VANTAGE_API_KEY)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let alpha_vantage_plan = match lookup(ENV_ALPHA_VANTAGE_PLAN) {
            Some(plan) if !plan.trim().is_empty() => plan.parse()?,
            _ => AlphaVantagePlan::default(),
        };

        let http_timeout = match lookup(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) if !raw.trim().is_empty() => {
                let secs: u64 = raw.trim().parse().map_err(|_| MarketDataError::Configuration {
                    provider: "MARKET_DATA".to_string(),
                    message: format!(
                        "{} must be a whole number of seconds, got '{}'",
                        ENV_HTTP_TIMEOUT_SECS, raw
                    ),
                })?;
                Duration::from_secs(secs)
            }
            _ => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            alpha_vantage_api_key,
            alpha_vantage_plan,
            http_timeout,
        })
    }
}
