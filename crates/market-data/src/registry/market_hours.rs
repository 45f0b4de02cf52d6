//! Advisory US equity session check.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

/// First UTC hour inside the session (09:00/10:00 New York depending on DST).
pub const MARKET_OPEN_HOUR_UTC: u32 = 14;

/// First UTC hour after the session.
pub const MARKET_CLOSE_HOUR_UTC: u32 = 21;

/// Whether `at` falls on a weekday between 14:00 and 21:00 UTC.
///
/// Holidays and daylight saving are ignored; callers use this only to decide
/// how eagerly to refresh prices.
pub fn is_market_hours_at(at: DateTime<Utc>) -> bool {
    let weekday = !matches!(at.weekday(), Weekday::Sat | Weekday::Sun);
    let hour = at.hour();
    weekday && (MARKET_OPEN_HOUR_UTC..MARKET_CLOSE_HOUR_UTC).contains(&hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_weekday_session() {
        // 2024-01-17 is a Wednesday
        assert!(is_market_hours_at(at(2024, 1, 17, 14, 0)));
        assert!(is_market_hours_at(at(2024, 1, 17, 20, 59)));
        assert!(!is_market_hours_at(at(2024, 1, 17, 13, 59)));
        assert!(!is_market_hours_at(at(2024, 1, 17, 21, 0)));
    }

    #[test]
    fn test_weekend_is_closed() {
        // 2024-01-20 is a Saturday, 2024-01-21 a Sunday
        assert!(!is_market_hours_at(at(2024, 1, 20, 15, 0)));
        assert!(!is_market_hours_at(at(2024, 1, 21, 15, 0)));
    }
}
