//! Error types for iCalendar processing.
//!
//! Errors fall into two groups:
//! - structural errors that abort a whole parse ([`IcsError::CalendarNotFound`])
//! - per-event errors that cause a single event to be skipped or degraded

use thiserror::Error;

/// A specialized Result type for iCalendar operations.
pub type IcsResult<T> = Result<T, IcsError>;

/// Errors that can occur while parsing, resolving or expanding calendar data.
#[derive(Debug, Error)]
pub enum IcsError {
    /// The input has no top-level VCALENDAR component.
    #[error("no VCALENDAR component found")]
    CalendarNotFound,

    /// A TZID could not be resolved from VTIMEZONE data or the IANA database.
    #[error("unknown timezone: {tzid}")]
    TimezoneNotFound { tzid: String },

    /// A required property is missing from a component.
    #[error("missing required property {name}")]
    MissingProperty { name: &'static str },

    /// A DATE or DATE-TIME value could not be parsed.
    #[error("invalid date-time value '{value}'")]
    InvalidDateTime { value: String },

    /// A UTC offset (TZOFFSETFROM/TZOFFSETTO) could not be parsed.
    #[error("invalid UTC offset '{value}'")]
    InvalidUtcOffset { value: String },

    /// A DURATION value could not be parsed.
    #[error("invalid duration '{value}'")]
    InvalidDuration { value: String },

    /// A recurrence rule is malformed or uses unsupported parts.
    #[error("invalid recurrence rule: {message}")]
    InvalidRecurrence { message: String },

    /// A query range is malformed.
    #[error("invalid query range: {message}")]
    InvalidRange { message: String },

    /// The prepared calendar could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IcsError {
    /// Creates a timezone-not-found error.
    pub fn timezone_not_found(tzid: impl Into<String>) -> Self {
        Self::TimezoneNotFound { tzid: tzid.into() }
    }

    /// Creates an invalid date-time error.
    pub fn invalid_date_time(value: impl Into<String>) -> Self {
        Self::InvalidDateTime {
            value: value.into(),
        }
    }

    /// Creates an invalid recurrence error.
    pub fn invalid_recurrence(message: impl Into<String>) -> Self {
        Self::InvalidRecurrence {
            message: message.into(),
        }
    }

    /// Creates an invalid range error.
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            IcsError::timezone_not_found("Mars/Olympus").to_string(),
            "unknown timezone: Mars/Olympus"
        );
        assert_eq!(
            IcsError::MissingProperty { name: "DTSTART" }.to_string(),
            "missing required property DTSTART"
        );
    }
}
