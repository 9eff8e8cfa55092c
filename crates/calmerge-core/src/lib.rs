//! Core calendar pipeline: ICS parsing, timezone rules, recurrence expansion

pub mod error;
pub mod expand;
pub mod ics;
pub mod prepared;
pub mod recurrence;
pub mod time;
pub mod timezone;
pub mod tracing;

#[cfg(test)]
mod golden_tests;

pub use error::{IcsError, IcsResult};
pub use expand::{
    EventIssue, EventOutcome, ExpandedEvent, Expansion, IssueKind, SOURCE_PROPERTY, UnexpandedEvent,
    expand_calendar, expand_event, parse_unexpanded_event,
};
pub use ics::{Component, ComponentKind, ParseWarning, ParsedCalendar, Property, parse_ics};
pub use prepared::{
    PreparedIcs, deserialize, expand_in, get_events_between, get_unexpanded_events, prepare,
    search_events, serialize,
};
pub use recurrence::RecurrenceRule;
pub use time::{TimeWindow, format_instant, parse_instant};
pub use timezone::{TimeZoneData, TimeZoneResolver, build_time_zone_data, create_time_zone_resolver};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
