//! VTIMEZONE processing and UTC offset resolution.
//!
//! Each STANDARD/DAYLIGHT observance becomes a [`TransitionRule`]. Annual
//! rules are re-evaluated for every year that is queried, so day-of-week
//! rules ("last Sunday of October") land on the right date in any year.
//! TZIDs without VTIMEZONE data fall back to the IANA database.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{IcsError, IcsResult};
use crate::ics::{Component, ComponentKind, IcsDateTime, parse_utc_offset};
use crate::time::{nth_weekday_of_month, parse_weekday};

/// Whether an observance is standard or daylight saving time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservanceKind {
    Standard,
    Daylight,
}

/// Which day of the month an annual transition falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DayRule {
    /// `BYDAY=-1SU`: the nth weekday, counting from the end when negative.
    NthWeekday { nth: i32, weekday: Weekday },
    /// `BYMONTHDAY=8,9,...,14;BYDAY=SU`: first `weekday` on or after `day`.
    WeekdayOnOrAfter { weekday: Weekday, day: u32 },
    /// `BYMONTHDAY=15`: a fixed day of the month.
    Fixed { day: u32 },
}

impl DayRule {
    fn date_in(&self, year: i32, month: u32) -> Option<NaiveDate> {
        match *self {
            Self::NthWeekday { nth, weekday } => nth_weekday_of_month(year, month, weekday, nth),
            Self::WeekdayOnOrAfter { weekday, day } => {
                let from = NaiveDate::from_ymd_opt(year, month, day)?;
                let ahead = (7 + weekday.num_days_from_monday()
                    - from.weekday().num_days_from_monday())
                    % 7;
                let date = from + Duration::days(i64::from(ahead));
                (date.month() == month).then_some(date)
            }
            Self::Fixed { day } => NaiveDate::from_ymd_opt(year, month, day),
        }
    }
}

/// A yearly recurrence of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualRule {
    /// Month of the transition (1-12).
    pub month: u32,
    /// Day within the month.
    pub day: DayRule,
    /// Last instant the rule applies (UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDateTime>,
}

/// One STANDARD or DAYLIGHT observance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRule {
    pub kind: ObservanceKind,
    /// Offset in force before the transition, minutes east of UTC.
    pub offset_from: i32,
    /// Offset in force after the transition, minutes east of UTC.
    pub offset_to: i32,
    /// First transition, as local wall time in the `offset_from` offset.
    pub start: NaiveDateTime,
    /// Yearly repetition, absent for one-shot transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<AnnualRule>,
}

impl TransitionRule {
    fn instant_of(&self, local: NaiveDateTime) -> NaiveDateTime {
        local - Duration::minutes(i64::from(self.offset_from))
    }

    /// Returns the transition instant (UTC) in the given year, if any.
    fn transition_in(&self, year: i32) -> Option<NaiveDateTime> {
        let Some(rule) = &self.recurrence else {
            return (self.start.year() == year).then(|| self.instant_of(self.start));
        };
        if year < self.start.year() {
            return None;
        }
        let local = rule.day.date_in(year, rule.month)?.and_time(self.start.time());
        if local < self.start {
            return None;
        }
        let instant = self.instant_of(local);
        match rule.until {
            Some(until) if instant > until => None,
            _ => Some(instant),
        }
    }

    /// Returns the latest transition instant at or before `at`.
    fn latest_at_or_before(&self, at: NaiveDateTime) -> Option<NaiveDateTime> {
        let Some(rule) = &self.recurrence else {
            let instant = self.instant_of(self.start);
            return (instant <= at).then_some(instant);
        };
        let cap = rule.until.map_or(at, |until| until.min(at));
        [cap.year(), cap.year() - 1]
            .into_iter()
            .filter_map(|year| self.transition_in(year))
            .filter(|instant| *instant <= cap)
            .max()
    }
}

/// Offset transition rules for one TZID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeZoneData {
    pub rules: Vec<TransitionRule>,
}

impl TimeZoneData {
    /// Returns the UTC offset in minutes in force at `instant`.
    ///
    /// Returns `None` when there are no rules.
    pub fn offset_at(&self, instant: DateTime<Utc>) -> Option<i32> {
        let at = instant.naive_utc();
        let latest = self
            .rules
            .iter()
            .filter_map(|rule| rule.latest_at_or_before(at).map(|when| (when, rule)))
            .max_by_key(|(when, _)| *when);

        if let Some((when, rule)) = latest {
            trace!(?when, offset = rule.offset_to, "Selected transition");
            return Some(rule.offset_to);
        }

        // Before the first transition the earliest observance's TZOFFSETFROM holds.
        self.rules
            .iter()
            .min_by_key(|rule| rule.start)
            .map(|rule| rule.offset_from)
    }
}

/// Builds transition rules for every VTIMEZONE, keyed by TZID.
///
/// VTIMEZONEs without TZID, and observances missing DTSTART or TZOFFSETTO,
/// are skipped with a warning.
pub fn build_time_zone_data(timezones: &[Component]) -> HashMap<String, TimeZoneData> {
    let mut data = HashMap::new();

    for timezone in timezones {
        let Some(tzid) = timezone.property_value("TZID") else {
            warn!("Skipping VTIMEZONE without TZID");
            continue;
        };

        let rules: Vec<TransitionRule> = timezone
            .children
            .iter()
            .filter_map(|child| {
                let kind = match child.kind {
                    ComponentKind::Standard => ObservanceKind::Standard,
                    ComponentKind::Daylight => ObservanceKind::Daylight,
                    _ => return None,
                };
                match parse_observance(kind, child) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        warn!(tzid, error = %e, "Skipping {} observance", child.kind);
                        None
                    }
                }
            })
            .collect();

        debug!(tzid, rules = rules.len(), "Built timezone rules");
        data.insert(tzid.to_string(), TimeZoneData { rules });
    }

    data
}

fn parse_observance(kind: ObservanceKind, component: &Component) -> IcsResult<TransitionRule> {
    let offset_to = component
        .property_value("TZOFFSETTO")
        .ok_or(IcsError::MissingProperty { name: "TZOFFSETTO" })
        .and_then(parse_utc_offset)?;
    let offset_from = match component.property_value("TZOFFSETFROM") {
        Some(value) => parse_utc_offset(value)?,
        None => offset_to,
    };
    let start = component
        .property_value("DTSTART")
        .ok_or(IcsError::MissingProperty { name: "DTSTART" })
        .and_then(|value| IcsDateTime::parse(value, None))?
        .local();

    let recurrence = match component.property_value("RRULE") {
        Some(rrule) => match parse_annual_rule(rrule, start) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(error = %e, "Treating observance as a one-shot transition");
                None
            }
        },
        None => None,
    };

    Ok(TransitionRule {
        kind,
        offset_from,
        offset_to,
        start,
        recurrence,
    })
}

fn parse_annual_rule(rrule: &str, start: NaiveDateTime) -> IcsResult<AnnualRule> {
    let mut freq = None;
    let mut month = None;
    let mut by_day: Option<(i32, Weekday)> = None;
    let mut month_days: Vec<u32> = Vec::new();
    let mut until = None;

    for part in rrule.split(';').filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| IcsError::invalid_recurrence(format!("malformed part '{part}'")))?;
        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.trim().to_ascii_uppercase()),
            "BYMONTH" => {
                month = Some(
                    value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|m| (1..=12).contains(m))
                        .ok_or_else(|| IcsError::invalid_recurrence(format!("bad BYMONTH '{value}'")))?,
                );
            }
            "BYDAY" => {
                by_day = Some(parse_ordinal_weekday(value).ok_or_else(|| {
                    IcsError::invalid_recurrence(format!("bad BYDAY '{value}'"))
                })?);
            }
            "BYMONTHDAY" => {
                month_days = value
                    .split(',')
                    .map(|d| d.trim().parse::<u32>().ok().filter(|d| (1..=31).contains(d)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| IcsError::invalid_recurrence(format!("bad BYMONTHDAY '{value}'")))?;
            }
            "UNTIL" => until = Some(IcsDateTime::parse(value, None)?.local()),
            _ => {}
        }
    }

    if freq.as_deref() != Some("YEARLY") {
        return Err(IcsError::invalid_recurrence(
            "timezone observances must repeat yearly",
        ));
    }

    let first_month_day = month_days.iter().copied().min();
    let day = match (by_day, first_month_day) {
        (Some((_, weekday)), Some(day)) => DayRule::WeekdayOnOrAfter { weekday, day },
        (Some((nth, weekday)), None) => DayRule::NthWeekday { nth, weekday },
        (None, Some(day)) => DayRule::Fixed { day },
        (None, None) => DayRule::Fixed { day: start.day() },
    };

    Ok(AnnualRule {
        month: month.unwrap_or_else(|| start.month()),
        day,
        until,
    })
}

/// Parses `-1SU`, `2SU` or `SU` (ordinal defaults to 1).
fn parse_ordinal_weekday(value: &str) -> Option<(i32, Weekday)> {
    let value = value.trim();
    let split = value.len().checked_sub(2)?;
    let (ordinal, code) = value.split_at_checked(split)?;
    let weekday = parse_weekday(code)?;
    let nth = match ordinal {
        "" | "+" => 1,
        n => n.parse::<i32>().ok().filter(|n| *n != 0 && n.abs() <= 5)?,
    };
    Some((nth, weekday))
}

/// Maps `(tzid, instant)` to a UTC offset.
///
/// Built from parsed VTIMEZONE data and holds no mutable state; create one
/// per query with [`create_time_zone_resolver`].
#[derive(Debug, Clone, Copy)]
pub struct TimeZoneResolver<'a> {
    data: &'a HashMap<String, TimeZoneData>,
}

/// Creates a resolver over the given timezone data.
pub fn create_time_zone_resolver(data: &HashMap<String, TimeZoneData>) -> TimeZoneResolver<'_> {
    TimeZoneResolver { data }
}

impl TimeZoneResolver<'_> {
    /// Returns the offset (minutes east of UTC) of `tzid` at `instant`.
    ///
    /// # Errors
    ///
    /// Returns [`IcsError::TimezoneNotFound`] when the TZID is neither
    /// described by VTIMEZONE data nor a known IANA zone.
    pub fn offset_minutes(&self, tzid: &str, instant: DateTime<Utc>) -> IcsResult<i32> {
        if let Some(offset) = self.data.get(tzid).and_then(|data| data.offset_at(instant)) {
            return Ok(offset);
        }

        let zone: Tz = tzid
            .parse()
            .map_err(|_| IcsError::timezone_not_found(tzid))?;
        let offset = zone
            .offset_from_utc_datetime(&instant.naive_utc())
            .fix()
            .local_minus_utc();
        Ok(offset / 60)
    }

    /// Converts a wall-clock time in `tzid` to UTC.
    ///
    /// The offset is looked up twice: once at the wall time read as UTC,
    /// then at the corrected instant. Times inside a DST gap or overlap
    /// resolve to one of the two candidate offsets.
    pub fn local_to_utc(&self, tzid: &str, local: NaiveDateTime) -> IcsResult<DateTime<Utc>> {
        let shift = |offset: i32| local - Duration::minutes(i64::from(offset));

        let guess = self.offset_minutes(tzid, local.and_utc())?;
        let refined = self.offset_minutes(tzid, shift(guess).and_utc())?;
        Ok(shift(refined).and_utc())
    }
}
