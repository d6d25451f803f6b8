// src/utils/time.rs

use crate::types::DateRange;
use crate::utils::{AnalyticsError, AnalyticsResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Gets the current UTC date and time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Gets the current UTC calendar date.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> AnalyticsResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| AnalyticsError::validation_error(format!("Invalid date '{}': {}", value, e)))
}

/// Number of calendar days covered by an inclusive range.
pub fn days_in_range(range: &DateRange) -> i64 {
    (range.end - range.start).num_days() + 1
}

/// The trailing `days`-long window ending on `end`.
pub fn trailing_range(end: NaiveDate, days: i64) -> DateRange {
    DateRange::new(end - Duration::days(days.max(1) - 1), end)
}
