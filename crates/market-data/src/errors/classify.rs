/// Classification for the waterfall's failure handling.
///
/// # Behavior Summary
///
/// | Class | Try Next Provider? | Counts Toward "All Rate Limited"? |
/// |-------|--------------------|-----------------------------------|
/// | `Abort` | No, error is surfaced immediately | No |
/// | `RateLimit` | Yes, after the provider's delay | Yes |
/// | `Failover` | Yes, after the provider's delay | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureClass {
    /// Malformed caller input. Every provider would reject it, so the
    /// waterfall stops and the error propagates.
    Abort,

    /// The provider is throttling us. Fail over to the next provider.
    RateLimit,

    /// Any other provider failure. Fail over to the next provider.
    Failover,
}

/// Lower-case fragments that mark an error message as a rate limit.
pub const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "too many requests",
    "429",
    "quota exceeded",
    "api limit",
];

/// Case-insensitive match of a message against [`RATE_LIMIT_PATTERNS`].
pub(crate) fn message_indicates_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
