//! Typed value parsing for DATE, DATE-TIME, UTC-OFFSET and DURATION.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::error::{IcsError, IcsResult};
use crate::timezone::TimeZoneResolver;

use super::component::Property;

/// Regex for ISO 8601 durations as used by RFC 5545 §3.3.6.
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("Invalid duration regex")
});

/// A DATE or DATE-TIME value as written in the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcsDateTime {
    /// `VALUE=DATE`, e.g. `20250210`.
    Date(NaiveDate),
    /// UTC time, e.g. `20250210T100000Z`.
    Utc(NaiveDateTime),
    /// Wall-clock time in a named zone (`TZID=...`).
    Zoned { local: NaiveDateTime, tzid: String },
    /// Wall-clock time without zone information.
    Floating(NaiveDateTime),
}

impl IcsDateTime {
    /// Parses a raw value, using `tzid` for non-UTC date-times.
    pub fn parse(value: &str, tzid: Option<&str>) -> IcsResult<Self> {
        let value = value.trim();

        if value.len() == 8 && !value.contains('T') {
            let date = NaiveDate::parse_from_str(value, "%Y%m%d")
                .map_err(|_| IcsError::invalid_date_time(value))?;
            return Ok(Self::Date(date));
        }

        if let Some(stripped) = value.strip_suffix(['Z', 'z']) {
            let naive = parse_naive(stripped)?;
            return Ok(Self::Utc(naive));
        }

        let naive = parse_naive(value)?;
        Ok(match tzid {
            Some(tzid) if !tzid.is_empty() => Self::Zoned {
                local: naive,
                tzid: tzid.to_string(),
            },
            _ => Self::Floating(naive),
        })
    }

    /// Parses the value of a property, honoring its TZID parameter.
    pub fn from_property(property: &Property) -> IcsResult<Self> {
        Self::parse(&property.value, property.tzid())
    }

    /// Returns the wall-clock time of this value.
    ///
    /// Dates are midnight.
    pub fn local(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(chrono::NaiveTime::MIN),
            Self::Utc(naive) | Self::Floating(naive) => *naive,
            Self::Zoned { local, .. } => *local,
        }
    }

    /// Returns the TZID this value is expressed in, if any.
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Converts to a UTC instant.
    ///
    /// Dates and floating times are read as UTC; zoned times go through the
    /// resolver and fail if their TZID is unknown.
    pub fn to_utc(&self, resolver: &TimeZoneResolver<'_>) -> IcsResult<DateTime<Utc>> {
        match self {
            Self::Zoned { local, tzid } => resolver.local_to_utc(tzid, *local),
            other => Ok(other.local().and_utc()),
        }
    }
}

fn parse_naive(value: &str) -> IcsResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M"))
        .map_err(|_| IcsError::invalid_date_time(value))
}

/// Parses a comma separated DATE/DATE-TIME list (EXDATE, RDATE).
pub fn parse_date_time_list(property: &Property) -> IcsResult<Vec<IcsDateTime>> {
    property
        .value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| IcsDateTime::parse(part, property.tzid()))
        .collect()
}

/// Parses a UTC offset such as `+0200`, `-0530` or `+013045` into minutes.
pub fn parse_utc_offset(value: &str) -> IcsResult<i32> {
    let value = value.trim();
    let invalid = || IcsError::InvalidUtcOffset {
        value: value.to_string(),
    };

    let (sign, digits) = match value.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    if !(digits.len() == 4 || digits.len() == 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[0..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..4].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    Ok(sign * (hours * 60 + minutes))
}

/// Parses an RFC 5545 DURATION value.
pub fn parse_duration(value: &str) -> IcsResult<Duration> {
    let value = value.trim();
    let invalid = || IcsError::InvalidDuration {
        value: value.to_string(),
    };

    let caps = DURATION_REGEX.captures(value).ok_or_else(invalid)?;
    let field = |i: usize| -> IcsResult<i64> {
        caps.get(i)
            .map_or(Ok(0), |m| m.as_str().parse::<i64>().map_err(|_| invalid()))
    };

    // "P" and "PT" alone carry no component.
    if (2..=6).all(|i| caps.get(i).is_none()) {
        return Err(invalid());
    }

    // Values beyond chrono's range are invalid, not a panic.
    let parts = [
        Duration::try_weeks(field(2)?),
        Duration::try_days(field(3)?),
        Duration::try_hours(field(4)?),
        Duration::try_minutes(field(5)?),
        Duration::try_seconds(field(6)?),
    ];
    let total = parts
        .into_iter()
        .try_fold(Duration::zero(), |sum, part| sum.checked_add(&part?))
        .ok_or_else(invalid)?;

    Ok(match caps.get(1).map(|m| m.as_str()) {
        Some("-") => -total,
        _ => total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn parse_date_only() {
        let value = IcsDateTime::parse("20250210", None).unwrap();
        assert_eq!(
            value,
            IcsDateTime::Date(NaiveDate::from_ymd_opt(2025, 2, 10).unwrap())
        );
        assert_eq!(value.local(), dt("2025-02-10 00:00:00"));
    }

    #[test]
    fn parse_utc_value_ignores_tzid() {
        let value = IcsDateTime::parse("20250205T143000Z", Some("Europe/Paris")).unwrap();
        assert_eq!(value, IcsDateTime::Utc(dt("2025-02-05 14:30:00")));
    }

    #[test]
    fn parse_zoned_and_floating() {
        let zoned = IcsDateTime::parse("20250205T143000", Some("Europe/Paris")).unwrap();
        assert_eq!(zoned.tzid(), Some("Europe/Paris"));
        assert_eq!(zoned.local(), dt("2025-02-05 14:30:00"));

        let floating = IcsDateTime::parse("20250205T143000", None).unwrap();
        assert_eq!(floating, IcsDateTime::Floating(dt("2025-02-05 14:30:00")));
    }

    #[test]
    fn parse_invalid_date_time() {
        assert!(IcsDateTime::parse("2025-02-05", None).is_err());
        assert!(IcsDateTime::parse("20251340T000000Z", None).is_err());
        assert!(IcsDateTime::parse("", None).is_err());
    }

    #[test]
    fn parse_list() {
        let prop = Property::new("EXDATE", "20250113T090000,20250120T090000")
            .with_param("TZID", "Europe/Berlin");
        let values = parse_date_time_list(&prop).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1].tzid(), Some("Europe/Berlin"));
    }

    #[test]
    fn utc_offsets() {
        assert_eq!(parse_utc_offset("+0200").unwrap(), 120);
        assert_eq!(parse_utc_offset("-0530").unwrap(), -330);
        assert_eq!(parse_utc_offset("+013045").unwrap(), 90);
        assert_eq!(parse_utc_offset("-0000").unwrap(), 0);
        assert!(parse_utc_offset("0200").is_err());
        assert!(parse_utc_offset("+2").is_err());
        assert!(parse_utc_offset("+0275").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("PT1H30M").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("P1W").unwrap(), Duration::weeks(1));
        assert_eq!(parse_duration("P1DT2H").unwrap(), Duration::hours(26));
        assert_eq!(parse_duration("-PT15M").unwrap(), Duration::minutes(-15));
        assert_eq!(parse_duration("PT0S").unwrap(), Duration::zero());
        assert!(parse_duration("P").is_err());
        assert!(parse_duration("PT").is_err());
        assert!(parse_duration("1H").is_err());
    }

    #[test]
    fn out_of_range_durations_are_invalid() {
        assert!(matches!(
            parse_duration("P999999999999999W"),
            Err(IcsError::InvalidDuration { .. })
        ));
        assert!(matches!(
            parse_duration("PT99999999999999999999S"),
            Err(IcsError::InvalidDuration { .. })
        ));
        assert!(parse_duration("P200000000D").is_ok());
    }
}
