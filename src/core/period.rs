//! Calendar and type-string helpers shared by filtering and aggregation.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{CostError, Result};

/// Average number of days in a month, used to turn a monthly estimate into a daily rate.
pub const AVG_DAYS_PER_MONTH: f64 = 30.44;

/// Provider prefix of a type string (`aws` for `aws:ec2/instance:Instance`).
#[must_use]
pub fn provider_from_type(resource_type: &str) -> &str {
    match resource_type.split(':').next() {
        Some(provider) if !provider.is_empty() => provider,
        _ => "unknown",
    }
}

/// Service segment of a type string (`ec2` for `aws:ec2/instance:Instance`).
///
/// Returns an empty string when the type has no segment after the provider.
#[must_use]
pub fn service_from_type(resource_type: &str) -> &str {
    resource_type
        .split(':')
        .nth(1)
        .and_then(|module| module.split('/').next())
        .unwrap_or("")
}

/// Parse a date given as `YYYY-MM-DD` or RFC 3339.
///
/// Bare dates resolve to midnight UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CostError::Config(format!("Invalid date '{trimmed}': {e}")))
}

/// Midnight UTC on the given day.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Number of whole calendar days in `[start, end)`, never less than one.
#[must_use]
pub fn day_span(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end.date_naive() - start.date_naive()).num_days().max(1)
}

/// Iterate the calendar days `start, start + 1, ...` for `count` days.
pub fn days_from(start: NaiveDate, count: usize) -> impl Iterator<Item = NaiveDate> {
    (0..count).filter_map(move |offset| {
        i64::try_from(offset)
            .ok()
            .and_then(|offset| start.checked_add_signed(Duration::days(offset)))
    })
}

/// Daily period key (`YYYY-MM-DD`).
#[must_use]
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Monthly period key (`YYYY-MM`).
#[must_use]
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn provider_and_service_extraction() {
        assert_eq!(provider_from_type("aws:ec2/instance:Instance"), "aws");
        assert_eq!(service_from_type("aws:ec2/instance:Instance"), "ec2");
        assert_eq!(provider_from_type("azure-native:compute:VirtualMachine"), "azure-native");
        assert_eq!(service_from_type("azure-native:compute:VirtualMachine"), "compute");
        assert_eq!(provider_from_type("custom"), "custom");
        assert_eq!(service_from_type("custom"), "");
        assert_eq!(provider_from_type(""), "unknown");
    }

    #[test]
    fn parse_bare_and_rfc3339_dates() {
        let bare = parse_date("2024-01-15").unwrap();
        assert_eq!(bare.date_naive(), date(2024, 1, 15));

        let full = parse_date("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(full.date_naive(), date(2024, 1, 15));

        assert!(parse_date("15/01/2024").is_err());
    }

    #[test]
    fn day_span_is_half_open_with_floor_of_one() {
        let start = start_of_day(date(2024, 1, 1));
        assert_eq!(day_span(start, start_of_day(date(2024, 1, 2))), 1);
        assert_eq!(day_span(start, start_of_day(date(2024, 1, 31))), 30);
        assert_eq!(day_span(start, start), 1);
    }

    #[test]
    fn days_from_crosses_month_boundary() {
        let days: Vec<_> = days_from(date(2024, 1, 30), 3).collect();
        assert_eq!(days, vec![date(2024, 1, 30), date(2024, 1, 31), date(2024, 2, 1)]);
    }

    #[test]
    fn period_keys_are_zero_padded() {
        assert_eq!(day_key(date(2024, 3, 5)), "2024-03-05");
        assert_eq!(month_key(date(2024, 3, 5)), "2024-03");
    }
}
