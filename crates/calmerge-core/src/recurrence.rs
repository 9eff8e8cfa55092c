//! RRULE parsing and occurrence generation.
//!
//! Occurrences are generated as wall-clock times in the event's own zone;
//! the expander converts each one to UTC through the timezone resolver, so
//! a 09:00 meeting stays at 09:00 local across DST changes.

use std::collections::VecDeque;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Weekday};

use crate::error::{IcsError, IcsResult};
use crate::ics::IcsDateTime;
use crate::time::{
    days_in_month, nth_weekday_of_month, nth_weekday_of_year, parse_weekday, weekdays_in_month,
    weekdays_in_year,
};

/// Upper bound on recurrence periods scanned for one event.
pub const MAX_PERIODS: u32 = 100_000;

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl FromStr for Frequency {
    type Err = IcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(IcsError::invalid_recurrence(format!("unsupported FREQ '{other}'"))),
        }
    }
}

/// A BYDAY entry such as `MO`, `2TU` or `-1FR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayNum {
    pub nth: Option<i32>,
    pub weekday: Weekday,
}

impl FromStr for WeekdayNum {
    type Err = IcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || IcsError::invalid_recurrence(format!("bad BYDAY entry '{s}'"));

        let split = s.len().checked_sub(2).ok_or_else(invalid)?;
        let (ordinal, code) = s.split_at_checked(split).ok_or_else(invalid)?;
        let weekday = parse_weekday(code).ok_or_else(invalid)?;
        let nth = match ordinal {
            "" => None,
            n => Some(
                n.trim_start_matches('+')
                    .parse::<i32>()
                    .ok()
                    .filter(|n| *n != 0 && n.abs() <= 53)
                    .ok_or_else(invalid)?,
            ),
        };
        Ok(Self { nth, weekday })
    }
}

/// A parsed RRULE restricted to the supported subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<IcsDateTime>,
    pub week_start: Weekday,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i32>,
    pub by_month: Vec<u32>,
}

impl FromStr for RecurrenceRule {
    type Err = IcsError;

    /// Parses an RRULE value.
    ///
    /// `BYSETPOS`, `BYYEARDAY`, `BYWEEKNO`, `BYHOUR`, `BYMINUTE` and
    /// `BYSECOND` are errors. Unknown `X-` parts are ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut freq = None;
        let mut rule = Self {
            freq: Frequency::Daily,
            interval: 1,
            count: None,
            until: None,
            week_start: Weekday::Mon,
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
        };

        for part in value.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| IcsError::invalid_recurrence(format!("malformed part '{part}'")))?;
            let val = val.trim();
            let number = |what: &str| {
                val.parse::<u32>()
                    .map_err(|_| IcsError::invalid_recurrence(format!("bad {what} '{val}'")))
            };

            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => freq = Some(val.parse::<Frequency>()?),
                "INTERVAL" => {
                    rule.interval = number("INTERVAL")?;
                    if rule.interval == 0 {
                        return Err(IcsError::invalid_recurrence("INTERVAL must be positive"));
                    }
                }
                "COUNT" => rule.count = Some(number("COUNT")?),
                "UNTIL" => rule.until = Some(IcsDateTime::parse(val, None)?),
                "WKST" => {
                    rule.week_start = parse_weekday(val).ok_or_else(|| {
                        IcsError::invalid_recurrence(format!("bad WKST '{val}'"))
                    })?;
                }
                "BYDAY" => {
                    rule.by_day = val
                        .split(',')
                        .map(str::parse::<WeekdayNum>)
                        .collect::<IcsResult<_>>()?;
                }
                "BYMONTHDAY" => {
                    rule.by_month_day = val
                        .split(',')
                        .map(|d| {
                            d.trim()
                                .parse::<i32>()
                                .ok()
                                .filter(|d| *d != 0 && d.abs() <= 31)
                                .ok_or_else(|| {
                                    IcsError::invalid_recurrence(format!("bad BYMONTHDAY '{d}'"))
                                })
                        })
                        .collect::<IcsResult<_>>()?;
                }
                "BYMONTH" => {
                    rule.by_month = val
                        .split(',')
                        .map(|m| {
                            m.trim()
                                .parse::<u32>()
                                .ok()
                                .filter(|m| (1..=12).contains(m))
                                .ok_or_else(|| {
                                    IcsError::invalid_recurrence(format!("bad BYMONTH '{m}'"))
                                })
                        })
                        .collect::<IcsResult<_>>()?;
                }
                unsupported @ ("BYSETPOS" | "BYYEARDAY" | "BYWEEKNO" | "BYHOUR" | "BYMINUTE"
                | "BYSECOND") => {
                    return Err(IcsError::invalid_recurrence(format!(
                        "{unsupported} is not supported"
                    )));
                }
                _ => {}
            }
        }

        rule.freq = freq.ok_or_else(|| IcsError::invalid_recurrence("missing FREQ"))?;
        if rule.count.is_some() && rule.until.is_some() {
            return Err(IcsError::invalid_recurrence("COUNT and UNTIL are exclusive"));
        }
        if rule.freq == Frequency::Weekly && rule.by_day.iter().any(|d| d.nth.is_some()) {
            return Err(IcsError::invalid_recurrence(
                "ordinal BYDAY is not valid for WEEKLY",
            ));
        }
        // Ordinals count within the month unless the rule is yearly without
        // BYMONTH, where they count within the year.
        let month_scoped = rule.freq == Frequency::Monthly
            || (rule.freq == Frequency::Yearly && !rule.by_month.is_empty());
        if month_scoped && rule.by_day.iter().any(|d| d.nth.is_some_and(|n| n.abs() > 5)) {
            return Err(IcsError::invalid_recurrence(
                "BYDAY ordinal exceeds the weeks of a month",
            ));
        }
        Ok(rule)
    }
}

impl RecurrenceRule {
    /// Returns true if a local occurrence start is past UNTIL.
    ///
    /// UTC values of UNTIL are compared by the caller against the UTC
    /// instant; this handles DATE and floating forms.
    pub fn is_past_local_until(&self, start: NaiveDateTime) -> bool {
        match &self.until {
            Some(IcsDateTime::Date(date)) => start.date() > *date,
            Some(IcsDateTime::Floating(until)) | Some(IcsDateTime::Zoned { local: until, .. }) => {
                start > *until
            }
            _ => false,
        }
    }

    /// Returns the UNTIL value as a UTC wall time, when written with `Z`.
    pub fn utc_until(&self) -> Option<NaiveDateTime> {
        match &self.until {
            Some(IcsDateTime::Utc(until)) => Some(*until),
            _ => None,
        }
    }

    /// Iterates occurrence start times (local wall time) beginning at `dtstart`.
    ///
    /// `dtstart` is always the first occurrence. COUNT is applied here;
    /// UNTIL is left to the caller, which knows the zone.
    pub fn occurrences(&self, dtstart: NaiveDateTime) -> Occurrences<'_> {
        Occurrences {
            rule: self,
            dtstart,
            period: 0,
            emitted: 0,
            pending: VecDeque::from([dtstart]),
            exhausted: false,
        }
    }

    fn period_dates(&self, dtstart: NaiveDateTime, period: u32) -> Option<Vec<NaiveDate>> {
        let start = dtstart.date();
        let step = period.checked_mul(self.interval)?;

        let mut dates = match self.freq {
            Frequency::Daily => {
                let date = start.checked_add_signed(Duration::days(i64::from(step)))?;
                let weekday_ok = self.by_day.is_empty()
                    || self.by_day.iter().any(|d| d.weekday == date.weekday());
                if weekday_ok { vec![date] } else { Vec::new() }
            }
            Frequency::Weekly => {
                let week_start = start
                    - Duration::days(i64::from(
                        (7 + start.weekday().num_days_from_monday()
                            - self.week_start.num_days_from_monday())
                            % 7,
                    ));
                let week = week_start.checked_add_signed(Duration::weeks(i64::from(step)))?;
                if self.by_day.is_empty() {
                    vec![week + (start - week_start)]
                } else {
                    self.by_day
                        .iter()
                        .map(|d| {
                            let offset = (7 + d.weekday.num_days_from_monday()
                                - self.week_start.num_days_from_monday())
                                % 7;
                            week + Duration::days(i64::from(offset))
                        })
                        .collect()
                }
            }
            Frequency::Monthly => {
                let first = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)?
                    .checked_add_months(Months::new(step))?;
                self.dates_in_month(first.year(), first.month(), start.day())
            }
            Frequency::Yearly => {
                let year = start.year().checked_add(i32::try_from(step).ok()?)?;
                if self.by_month.is_empty() && self.by_month_day.is_empty() && !self.by_day.is_empty() {
                    self.weekdays_of_year(year)
                } else {
                    // BYMONTHDAY alone applies to every month of the year.
                    let months = match (self.by_month.is_empty(), self.by_month_day.is_empty()) {
                        (false, _) => self.by_month.clone(),
                        (true, false) => (1..=12).collect(),
                        (true, true) => vec![start.month()],
                    };
                    months
                        .into_iter()
                        .flat_map(|month| self.dates_in_month(year, month, start.day()))
                        .collect()
                }
            }
        };

        if self.freq != Frequency::Yearly && !self.by_month.is_empty() {
            dates.retain(|d| self.by_month.contains(&d.month()));
        }
        dates.sort_unstable();
        dates.dedup();
        Some(dates)
    }

    fn weekdays_of_year(&self, year: i32) -> Vec<NaiveDate> {
        self.by_day
            .iter()
            .flat_map(|d| match d.nth {
                Some(nth) => nth_weekday_of_year(year, d.weekday, nth).into_iter().collect(),
                None => weekdays_in_year(year, d.weekday),
            })
            .collect()
    }

    fn dates_in_month(&self, year: i32, month: u32, default_day: u32) -> Vec<NaiveDate> {
        let last = days_in_month(year, month);

        if !self.by_month_day.is_empty() {
            return self
                .by_month_day
                .iter()
                .filter_map(|&d| {
                    let day = if d > 0 { d } else { last as i32 + 1 + d };
                    u32::try_from(day).ok().filter(|day| (1..=last).contains(day))
                })
                .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
                .filter(|date| {
                    self.by_day.is_empty() || self.by_day.iter().any(|d| d.weekday == date.weekday())
                })
                .collect();
        }

        if !self.by_day.is_empty() {
            return self
                .by_day
                .iter()
                .flat_map(|d| match d.nth {
                    Some(nth) => nth_weekday_of_month(year, month, d.weekday, nth)
                        .into_iter()
                        .collect(),
                    None => weekdays_in_month(year, month, d.weekday),
                })
                .collect();
        }

        // Months without the start's day (31st, Feb 29) have no occurrence.
        NaiveDate::from_ymd_opt(year, month, default_day)
            .into_iter()
            .collect()
    }
}

/// Iterator over local occurrence starts; see [`RecurrenceRule::occurrences`].
#[derive(Debug)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    dtstart: NaiveDateTime,
    period: u32,
    emitted: u32,
    pending: VecDeque<NaiveDateTime>,
    exhausted: bool,
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rule.count.is_some_and(|count| self.emitted >= count) {
            return None;
        }

        while self.pending.is_empty() {
            if self.exhausted || self.period >= MAX_PERIODS {
                return None;
            }
            let Some(dates) = self.rule.period_dates(self.dtstart, self.period) else {
                self.exhausted = true;
                return None;
            };
            self.period += 1;

            let time = self.dtstart.time();
            // DTSTART was queued up front; skip it and anything before it.
            self.pending.extend(
                dates
                    .into_iter()
                    .map(|date| date.and_time(time))
                    .filter(|start| *start > self.dtstart),
            );
        }

        let next = self.pending.pop_front()?;
        self.emitted += 1;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn take(rule: &str, start: &str, n: usize) -> Vec<String> {
        let rule: RecurrenceRule = rule.parse().unwrap();
        rule.occurrences(dt(start))
            .take(n)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .collect()
    }

    #[test]
    fn parse_full_rule() {
        let rule: RecurrenceRule = "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;WKST=SU;UNTIL=20250301T000000Z"
            .parse()
            .unwrap();
        assert_eq!(rule.freq, Frequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(rule.week_start, Weekday::Sun);
        assert_eq!(rule.by_day.len(), 2);
        assert_eq!(rule.utc_until(), Some(dt("2025-03-01 00:00")));
    }

    #[test]
    fn parse_rejects_unsupported_parts() {
        for bad in [
            "FREQ=MONTHLY;BYSETPOS=-1;BYDAY=MO,TU",
            "FREQ=HOURLY",
            "INTERVAL=2",
            "FREQ=DAILY;INTERVAL=0",
            "FREQ=DAILY;COUNT=x",
            "FREQ=WEEKLY;BYDAY=2MO",
            "FREQ=MONTHLY;BYDAY=6FR",
            "FREQ=YEARLY;BYMONTH=1;BYDAY=20MO",
            "FREQ=DAILY;COUNT=3;UNTIL=20250101",
            "garbage",
        ] {
            assert!(
                matches!(bad.parse::<RecurrenceRule>(), Err(IcsError::InvalidRecurrence { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn daily_with_count() {
        assert_eq!(
            take("FREQ=DAILY;COUNT=3", "2025-01-30 09:00", 10),
            vec!["2025-01-30 09:00", "2025-01-31 09:00", "2025-02-01 09:00"]
        );
    }

    #[test]
    fn daily_weekdays_only() {
        assert_eq!(
            take("FREQ=DAILY;BYDAY=MO,TU,WE,TH,FR", "2025-01-10 09:00", 3),
            vec!["2025-01-10 09:00", "2025-01-13 09:00", "2025-01-14 09:00"]
        );
    }

    #[test]
    fn weekly_interval_and_days() {
        // 2025-01-06 is a Monday
        assert_eq!(
            take("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TH", "2025-01-06 10:00", 5),
            vec![
                "2025-01-06 10:00",
                "2025-01-09 10:00",
                "2025-01-20 10:00",
                "2025-01-23 10:00",
                "2025-02-03 10:00"
            ]
        );
    }

    #[test]
    fn weekly_without_byday_uses_start_weekday() {
        assert_eq!(
            take("FREQ=WEEKLY", "2025-01-08 10:00", 3),
            vec!["2025-01-08 10:00", "2025-01-15 10:00", "2025-01-22 10:00"]
        );
    }

    #[test]
    fn monthly_skips_missing_days() {
        assert_eq!(
            take("FREQ=MONTHLY;COUNT=4", "2025-01-31 12:00", 10),
            vec![
                "2025-01-31 12:00",
                "2025-03-31 12:00",
                "2025-05-31 12:00",
                "2025-07-31 12:00"
            ]
        );
    }

    #[test]
    fn monthly_ordinal_weekday() {
        // Last Friday of each month
        assert_eq!(
            take("FREQ=MONTHLY;BYDAY=-1FR", "2025-01-31 16:00", 3),
            vec!["2025-01-31 16:00", "2025-02-28 16:00", "2025-03-28 16:00"]
        );
    }

    #[test]
    fn monthly_by_month_day() {
        assert_eq!(
            take("FREQ=MONTHLY;BYMONTHDAY=1,-1", "2025-01-01 08:00", 4),
            vec!["2025-01-01 08:00", "2025-01-31 08:00", "2025-02-01 08:00", "2025-02-28 08:00"]
        );
    }

    #[test]
    fn yearly_leap_day() {
        assert_eq!(
            take("FREQ=YEARLY;COUNT=2", "2024-02-29 00:00", 5),
            vec!["2024-02-29 00:00", "2028-02-29 00:00"]
        );
    }

    #[test]
    fn yearly_by_month_and_day() {
        // Thanksgiving: 4th Thursday of November
        assert_eq!(
            take("FREQ=YEARLY;BYMONTH=11;BYDAY=4TH", "2024-11-28 12:00", 3),
            vec!["2024-11-28 12:00", "2025-11-27 12:00", "2026-11-26 12:00"]
        );
    }

    #[test]
    fn yearly_weekday_without_month_spans_the_year() {
        // 2025-12-29 is the last Monday of 2025
        assert_eq!(
            take("FREQ=YEARLY;BYDAY=MO;COUNT=3", "2025-12-29 09:00", 10),
            vec!["2025-12-29 09:00", "2026-01-05 09:00", "2026-01-12 09:00"]
        );
    }

    #[test]
    fn yearly_ordinal_weekday_counts_within_the_year() {
        assert_eq!(
            take("FREQ=YEARLY;BYDAY=20MO;COUNT=3", "2025-05-19 09:00", 10),
            vec!["2025-05-19 09:00", "2026-05-18 09:00", "2027-05-17 09:00"]
        );
        assert_eq!(
            take("FREQ=YEARLY;BYDAY=-1FR", "2025-12-26 17:00", 2),
            vec!["2025-12-26 17:00", "2026-12-25 17:00"]
        );
    }

    #[test]
    fn yearly_month_day_without_month_covers_every_month() {
        assert_eq!(
            take("FREQ=YEARLY;BYMONTHDAY=15;COUNT=3", "2025-11-15 08:00", 10),
            vec!["2025-11-15 08:00", "2025-12-15 08:00", "2026-01-15 08:00"]
        );
    }

    #[test]
    fn until_is_left_to_the_caller() {
        let rule: RecurrenceRule = "FREQ=DAILY;UNTIL=20250112".parse().unwrap();
        assert!(!rule.is_past_local_until(dt("2025-01-12 23:00")));
        assert!(rule.is_past_local_until(dt("2025-01-13 00:00")));
        assert_eq!(rule.utc_until(), None);
    }

    #[test]
    fn generation_is_bounded() {
        // BYMONTHDAY=31 with BYMONTH=2 never matches
        let rule: RecurrenceRule = "FREQ=MONTHLY;BYMONTH=2;BYMONTHDAY=31".parse().unwrap();
        let rest: Vec<_> = rule.occurrences(dt("2025-01-31 00:00")).skip(1).collect();
        assert!(rest.is_empty());
    }
}
