//! Per-call record of what each provider did during a waterfall.

use crate::errors::FailureClass;

/// Why a provider was not called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// `enabled()` returned false.
    Disabled,

    /// `is_available()` returned false (e.g. missing API key).
    Unavailable,
}

/// Outcome of asking one provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Skipped(SkipReason),
    /// Call succeeded but the provider had nothing for the symbol.
    Empty,
    Failed { class: FailureClass, message: String },
    Success,
}

/// Record of a single provider attempt during a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider: &'static str,
    pub outcome: AttemptOutcome,
}

/// Detailed result of a fetch operation.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn record_skip(&mut self, provider: &'static str, reason: SkipReason) {
        self.push(provider, AttemptOutcome::Skipped(reason));
    }

    pub fn record_empty(&mut self, provider: &'static str) {
        self.push(provider, AttemptOutcome::Empty);
    }

    pub fn record_error(&mut self, provider: &'static str, class: FailureClass, message: String) {
        self.push(provider, AttemptOutcome::Failed { class, message });
    }

    pub fn record_success(&mut self, provider: &'static str) {
        self.push(provider, AttemptOutcome::Success);
    }

    fn push(&mut self, provider: &'static str, outcome: AttemptOutcome) {
        self.attempts.push(ProviderAttempt { provider, outcome });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Success => format!("{}: SUCCESS", a.provider),
                AttemptOutcome::Empty => format!("{}: EMPTY", a.provider),
                AttemptOutcome::Skipped(reason) => {
                    format!("{}: SKIPPED ({:?})", a.provider, reason)
                }
                AttemptOutcome::Failed { message, .. } => {
                    format!("{}: ERROR ({})", a.provider, message)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any provider succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.outcome == AttemptOutcome::Success)
    }

    /// Number of providers that returned an error.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// True when at least one provider failed and every failure was a rate limit.
    pub fn all_failures_rate_limited(&self) -> bool {
        self.failure_count() > 0
            && self
                .failures()
                .all(|class| class == FailureClass::RateLimit)
    }

    fn failures(&self) -> impl Iterator<Item = FailureClass> + '_ {
        self.attempts.iter().filter_map(|a| match a.outcome {
            AttemptOutcome::Failed { class, .. } => Some(class),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = FetchDiagnostics::new();
        diag.record_skip("ALPHA_VANTAGE", SkipReason::Unavailable);
        diag.record_error("MOCK", FailureClass::Failover, "Timeout".to_string());
        diag.record_success("YAHOO");

        let summary = diag.summary();
        assert!(summary.contains("ALPHA_VANTAGE: SKIPPED (Unavailable)"));
        assert!(summary.contains("MOCK: ERROR (Timeout)"));
        assert!(summary.contains("YAHOO: SUCCESS"));
    }

    #[test]
    fn test_has_success() {
        let mut diag = FetchDiagnostics::new();
        diag.record_empty("ALPHA_VANTAGE");
        assert!(!diag.has_success());

        diag.record_success("YAHOO");
        assert!(diag.has_success());
    }

    #[test]
    fn test_all_failures_rate_limited() {
        let mut diag = FetchDiagnostics::new();
        assert!(!diag.all_failures_rate_limited());

        diag.record_error("A", FailureClass::RateLimit, "429".to_string());
        diag.record_empty("B");
        assert!(diag.all_failures_rate_limited());

        diag.record_error("C", FailureClass::Failover, "HTTP 500".to_string());
        assert!(!diag.all_failures_rate_limited());
        assert_eq!(diag.failure_count(), 2);
    }
}
