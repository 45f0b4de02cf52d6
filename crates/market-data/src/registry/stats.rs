use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::PriceProvider;

/// Snapshot of one registered provider's configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub name: String,
    pub enabled: bool,
    pub available: bool,
    #[serde(rename = "rateLimitDelayMs", with = "duration_millis")]
    pub rate_limit_delay: Duration,
}

impl ProviderStats {
    pub fn from_provider(provider: &dyn PriceProvider) -> Self {
        Self {
            name: provider.name().to_string(),
            enabled: provider.enabled(),
            available: provider.is_available(),
            rate_limit_delay: provider.rate_limit_delay(),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_delay_in_millis() {
        let stats = ProviderStats {
            name: "ALPHA_VANTAGE".to_string(),
            enabled: true,
            available: false,
            rate_limit_delay: Duration::from_secs(12),
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["rateLimitDelayMs"], 12_000);
        assert_eq!(json["available"], false);

        let back: ProviderStats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }
}
