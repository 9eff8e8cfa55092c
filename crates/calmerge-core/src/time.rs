//! Time helpers shared by the timezone processor and the recurrence expander.
//!
//! This module provides [`TimeWindow`] for query ranges, the canonical
//! ISO-8601 instant format used in expanded output, and calendar arithmetic
//! (nth weekday of a month or year, days in a month).

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, SecondsFormat, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{IcsError, IcsResult};

/// Formats an instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Every instant in expanded output uses this form, so lexicographic order
/// equals chronological order.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 instant with any offset and normalizes it to UTC.
pub fn parse_instant(value: &str) -> IcsResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| IcsError::invalid_range(format!("'{value}' is not an RFC 3339 instant: {e}")))
}

/// A closed query window `[start, end]` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Errors
    ///
    /// Returns [`IcsError::InvalidRange`] if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> IcsResult<Self> {
        if start > end {
            return Err(IcsError::invalid_range(format!(
                "start {} is after end {}",
                format_instant(start),
                format_instant(end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses a window from two RFC 3339 strings.
    pub fn parse(start: &str, end: &str) -> IcsResult<Self> {
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }

    /// Creates a window starting at `now` and extending `duration`.
    pub fn from_now(now: DateTime<Utc>, duration: Duration) -> Self {
        if duration < Duration::zero() {
            return Self {
                start: now + duration,
                end: now,
            };
        }
        Self {
            start: now,
            end: now + duration,
        }
    }

    /// Checks if an event spanning `[start, end]` touches this window.
    ///
    /// An event ending exactly at the window start, or starting exactly at
    /// the window end, overlaps.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.end && end >= self.start
    }
}

/// Parses a two-letter iCalendar weekday code (`MO`..`SU`).
pub fn parse_weekday(code: &str) -> Option<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Returns the number of days in a month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

/// Returns the `nth` occurrence of `weekday` in a month.
///
/// Positive `nth` counts from the start (1 = first), negative from the end
/// (-1 = last). Returns `None` for 0 or when the month has no such day.
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: i32) -> Option<NaiveDate> {
    match nth.signum() {
        1 => {
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
            let day = 1 + offset + 7 * (nth as u32 - 1);
            NaiveDate::from_ymd_opt(year, month, day)
        }
        -1 => {
            let last_day = days_in_month(year, month);
            let last = NaiveDate::from_ymd_opt(year, month, last_day)?;
            let offset = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
            let back = offset + 7 * (nth.unsigned_abs() - 1);
            if back >= last_day {
                return None;
            }
            NaiveDate::from_ymd_opt(year, month, last_day - back)
        }
        _ => None,
    }
}

/// Returns every date in a month that falls on `weekday`.
pub fn weekdays_in_month(year: i32, month: u32, weekday: Weekday) -> Vec<NaiveDate> {
    (1..=5)
        .filter_map(|n| nth_weekday_of_month(year, month, weekday, n))
        .collect()
}

/// Returns the `nth` occurrence of `weekday` in a year, counted like
/// [`nth_weekday_of_month`].
pub fn nth_weekday_of_year(year: i32, weekday: Weekday, nth: i32) -> Option<NaiveDate> {
    let found = match nth.signum() {
        1 => {
            let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
            let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
            first.checked_add_days(Days::new(u64::from(offset + 7 * (nth as u32 - 1))))?
        }
        -1 => {
            let last = NaiveDate::from_ymd_opt(year, 12, 31)?;
            let offset = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
            last.checked_sub_days(Days::new(u64::from(offset + 7 * (nth.unsigned_abs() - 1))))?
        }
        _ => return None,
    };
    (found.year() == year).then_some(found)
}

/// Returns every date in a year that falls on `weekday`.
pub fn weekdays_in_year(year: i32, weekday: Weekday) -> Vec<NaiveDate> {
    (1..=53)
        .filter_map(|n| nth_weekday_of_year(year, weekday, n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod instants {
        use super::*;

        #[test]
        fn format_uses_millis_and_z() {
            assert_eq!(format_instant(utc(2025, 1, 10, 9, 0, 0)), "2025-01-10T09:00:00.000Z");
        }

        #[test]
        fn parse_normalizes_offsets() {
            assert_eq!(
                parse_instant("2025-03-30T03:00:00+02:00").unwrap(),
                utc(2025, 3, 30, 1, 0, 0)
            );
            assert_eq!(parse_instant("2025-01-10T09:00:00.000Z").unwrap(), utc(2025, 1, 10, 9, 0, 0));
            assert!(matches!(
                parse_instant("next tuesday"),
                Err(IcsError::InvalidRange { .. })
            ));
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn rejects_inverted_window() {
            let result = TimeWindow::new(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 9, 0, 0));
            assert!(matches!(result, Err(IcsError::InvalidRange { .. })));
        }

        #[test]
        fn overlaps_touching_events() {
            let window = TimeWindow::new(utc(2025, 2, 5, 9, 0, 0), utc(2025, 2, 5, 17, 0, 0)).unwrap();

            // Ends exactly at window start
            assert!(window.overlaps(utc(2025, 2, 5, 8, 0, 0), utc(2025, 2, 5, 9, 0, 0)));
            // Starts exactly at window end
            assert!(window.overlaps(utc(2025, 2, 5, 17, 0, 0), utc(2025, 2, 5, 18, 0, 0)));
            // Contains the window
            assert!(window.overlaps(utc(2025, 2, 5, 8, 0, 0), utc(2025, 2, 5, 18, 0, 0)));
            // Entirely before
            assert!(!window.overlaps(utc(2025, 2, 5, 7, 0, 0), utc(2025, 2, 5, 8, 59, 59)));
        }

        #[test]
        fn from_now_handles_negative_duration() {
            let now = utc(2025, 2, 5, 12, 0, 0);
            let window = TimeWindow::from_now(now, Duration::days(-1));
            assert_eq!(window.start, utc(2025, 2, 4, 12, 0, 0));
            assert_eq!(window.end, now);
        }
    }

    mod calendar {
        use super::*;

        #[test]
        fn weekday_codes() {
            assert_eq!(parse_weekday("SU"), Some(Weekday::Sun));
            assert_eq!(parse_weekday("mo"), Some(Weekday::Mon));
            assert_eq!(parse_weekday("XX"), None);
        }

        #[test]
        fn month_lengths() {
            assert_eq!(days_in_month(2024, 2), 29);
            assert_eq!(days_in_month(2025, 2), 28);
            assert_eq!(days_in_month(2025, 12), 31);
            assert_eq!(days_in_month(2025, 4), 30);
        }

        #[test]
        fn last_sunday() {
            assert_eq!(nth_weekday_of_month(2025, 3, Weekday::Sun, -1), Some(date(2025, 3, 30)));
            assert_eq!(nth_weekday_of_month(2025, 10, Weekday::Sun, -1), Some(date(2025, 10, 26)));
            assert_eq!(nth_weekday_of_month(2026, 3, Weekday::Sun, -1), Some(date(2026, 3, 29)));
        }

        #[test]
        fn nth_from_start() {
            assert_eq!(nth_weekday_of_month(2025, 3, Weekday::Sun, 2), Some(date(2025, 3, 9)));
            assert_eq!(nth_weekday_of_month(2025, 11, Weekday::Sun, 1), Some(date(2025, 11, 2)));
            // March 2025 has only five Saturdays at most; no sixth
            assert_eq!(nth_weekday_of_month(2025, 3, Weekday::Sat, 6), None);
            assert_eq!(nth_weekday_of_month(2025, 3, Weekday::Sat, 0), None);
        }

        #[test]
        fn all_weekdays() {
            let mondays = weekdays_in_month(2025, 3, Weekday::Mon);
            assert_eq!(
                mondays,
                vec![date(2025, 3, 3), date(2025, 3, 10), date(2025, 3, 17), date(2025, 3, 24), date(2025, 3, 31)]
            );
        }

        #[test]
        fn weekdays_across_a_year() {
            assert_eq!(nth_weekday_of_year(2026, Weekday::Mon, 1), Some(date(2026, 1, 5)));
            assert_eq!(nth_weekday_of_year(2026, Weekday::Mon, 20), Some(date(2026, 5, 18)));
            assert_eq!(nth_weekday_of_year(2025, Weekday::Mon, -1), Some(date(2025, 12, 29)));
            // 2026 has 52 Mondays
            assert_eq!(nth_weekday_of_year(2026, Weekday::Mon, 53), None);
            assert_eq!(nth_weekday_of_year(2026, Weekday::Mon, -53), None);

            let mondays = weekdays_in_year(2026, Weekday::Mon);
            assert_eq!(mondays.len(), 52);
            assert_eq!(mondays.first(), Some(&date(2026, 1, 5)));
            assert_eq!(mondays.last(), Some(&date(2026, 12, 28)));
        }
    }
}
