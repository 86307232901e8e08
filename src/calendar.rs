//! Date and time helpers for the `YYYY-MM-DD` / `HH:MM` record format.

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Textual date format used in every record
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Textual 24-hour time format used in every record
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse a strict `YYYY-MM-DD` date
///
/// chrono accepts unpadded fields, so the shape is checked first: anything
/// other than ten characters with dashes at positions 4 and 7 is rejected.
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

/// Parse a strict `HH:MM` 24-hour time
#[must_use]
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 5
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 => *b == b':',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveTime::parse_from_str(text, TIME_FORMAT).ok()
}

/// Parse either `YYYY-MM-DD HH:MM` or a bare date
///
/// The second element tells whether a time-of-day was present.
#[must_use]
pub fn parse_date_or_date_time(text: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let text = text.trim();
    match text.split_once([' ', 'T']) {
        Some((date, time)) => Some((parse_date(date)?, Some(parse_time(time)?))),
        None => Some((parse_date(text)?, None)),
    }
}

/// Format a date as `YYYY-MM-DD`
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a time as `HH:MM`
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Add calendar months, clamping the day to the end of shorter months
///
/// `2024-02-29 + 12 months` is `2025-02-28`. Saturates at chrono's maximum
/// date rather than failing.
#[must_use]
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

/// Add whole days, saturating at chrono's date bounds
#[must_use]
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(chrono::Days::new(u64::from(days))).unwrap_or(NaiveDate::MAX)
}

/// Calendar-day difference `later - earlier` (negative when `later` is before)
#[must_use]
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}

/// Combine a date and a time into a date-time
#[must_use]
pub fn at(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}

/// Full English weekday name
#[must_use]
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn test_strict_date_shape() {
        assert_eq!(parse_date("2024-11-05"), Some(date(2024, 11, 5)));
        assert_eq!(parse_date("2024/11/05"), None);
        assert_eq!(parse_date("2024-1-05"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_strict_time_shape() {
        assert!(parse_time("09:00").is_some());
        assert!(parse_time("9:00").is_none());
        assert!(parse_time("24:00").is_none());
        assert!(parse_time("10:00:00").is_none());
    }

    #[test]
    fn test_month_arithmetic_keeps_day_of_month() {
        assert_eq!(add_months(date(2024, 3, 20), 12), date(2025, 3, 20));
        assert_eq!(add_months(date(2024, 2, 29), 12), date(2025, 2, 28));
        assert_eq!(add_months(date(2024, 11, 5), 12), date(2025, 11, 5));
    }

    #[test]
    fn test_date_or_date_time() {
        assert_eq!(parse_date_or_date_time("2024-01-20"), Some((date(2024, 1, 20), None)));
        let (d, t) = parse_date_or_date_time("2024-01-20 13:30").unwrap_or_default();
        assert_eq!(d, date(2024, 1, 20));
        assert_eq!(t.map(format_time).as_deref(), Some("13:30"));
        assert_eq!(parse_date_or_date_time("2024-01-20 1pm"), None);
    }

    #[test]
    fn test_days_between_is_signed() {
        assert_eq!(days_between(date(2024, 1, 31), date(2024, 2, 10)), 10);
        assert_eq!(days_between(date(2024, 1, 31), date(2024, 1, 30)), -1);
    }
}
