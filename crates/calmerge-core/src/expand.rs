//! Event expansion: VEVENT components to concrete occurrences.
//!
//! Each VEVENT is handled on its own. A bad event (missing DTSTART, unknown
//! TZID) is skipped and reported as an [`EventIssue`]; a bad RRULE degrades
//! the event to its master instance. Neither affects the other events.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IcsError, IcsResult};
use crate::ics::{Component, IcsDateTime, parse_date_time_list, parse_duration, unescape_text};
use crate::recurrence::RecurrenceRule;
use crate::time::{TimeWindow, format_instant};
use crate::timezone::TimeZoneResolver;

/// Property used to tag events with the name of the source they came from.
pub const SOURCE_PROPERTY: &str = "X-MCP-SOURCE";

/// One concrete occurrence of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedEvent {
    /// Event UID; recurring instances get `${uid}_${startEpochMillis}`.
    pub uid: String,
    /// Start instant, `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Name of the calendar source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One VEVENT definition, without occurrence generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnexpandedEvent {
    pub uid: String,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// True when the event carries an RRULE.
    pub recurring: bool,
}

impl UnexpandedEvent {
    /// Returns true if summary, description or location contains `query`,
    /// ignoring case.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [Some(&self.summary), self.description.as_ref(), self.location.as_ref()]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(&query))
    }
}

/// What happened to a single VEVENT during expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Occurrences in range (possibly none).
    Expanded(Vec<ExpandedEvent>),
    /// The RRULE was unusable; only the master instance was considered.
    Fallback {
        events: Vec<ExpandedEvent>,
        reason: String,
    },
    /// The event could not be used at all.
    Skipped { reason: String },
}

/// Kind of a per-event problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Skipped,
    RecurrenceIgnored,
}

/// A per-event problem recorded during expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventIssue {
    pub uid: String,
    pub kind: IssueKind,
    pub message: String,
}

/// Result of expanding a calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Occurrences sorted by start.
    pub events: Vec<ExpandedEvent>,
    pub issues: Vec<EventIssue>,
}

/// Text fields shared by expanded and unexpanded output.
struct EventText {
    summary: String,
    description: Option<String>,
    location: Option<String>,
    source: Option<String>,
}

impl EventText {
    fn of(event: &Component) -> Self {
        let text = |name: &str| event.property_value(name).map(unescape_text);
        Self {
            summary: text("SUMMARY").unwrap_or_default(),
            description: text("DESCRIPTION"),
            location: text("LOCATION"),
            source: event.property_value(SOURCE_PROPERTY).map(str::to_string),
        }
    }

    fn occurrence(&self, uid: String, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> ExpandedEvent {
        ExpandedEvent {
            uid,
            start: format_instant(start),
            end: end.map(format_instant),
            summary: self.summary.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            source: self.source.clone(),
        }
    }
}

/// Resolved start and optional end of a VEVENT.
struct EventSpan {
    dtstart: IcsDateTime,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

fn event_span(event: &Component, resolver: &TimeZoneResolver<'_>) -> IcsResult<EventSpan> {
    let dtstart = event
        .property("DTSTART")
        .ok_or(IcsError::MissingProperty { name: "DTSTART" })
        .and_then(IcsDateTime::from_property)?;
    let start = dtstart.to_utc(resolver)?;

    let end = match (event.property("DTEND"), event.property_value("DURATION")) {
        (Some(dtend), _) => Some(IcsDateTime::from_property(dtend)?.to_utc(resolver)?),
        (None, Some(value)) => {
            let duration = parse_duration(value)?;
            let end = start
                .checked_add_signed(duration)
                .ok_or_else(|| IcsError::InvalidDuration {
                    value: value.to_string(),
                })?;
            Some(end)
        }
        (None, None) => None,
    };

    Ok(EventSpan { dtstart, start, end })
}

/// UTC instant of an event's RECURRENCE-ID, if it has one.
fn recurrence_id(event: &Component, resolver: &TimeZoneResolver<'_>) -> Option<IcsResult<DateTime<Utc>>> {
    event
        .property("RECURRENCE-ID")
        .map(|prop| IcsDateTime::from_property(prop).and_then(|rid| rid.to_utc(resolver)))
}

fn is_cancelled(event: &Component) -> bool {
    event
        .property_value("STATUS")
        .is_some_and(|status| status.trim().eq_ignore_ascii_case("CANCELLED"))
}

fn instance_uid(uid: &str, start: DateTime<Utc>) -> String {
    format!("{uid}_{}", start.timestamp_millis())
}

/// Expands one VEVENT into the occurrences that overlap `window`.
///
/// `overridden` holds the RECURRENCE-ID instants of this event's
/// exceptions; generated occurrences at those instants are suppressed.
pub fn expand_event(
    event: &Component,
    resolver: &TimeZoneResolver<'_>,
    window: &TimeWindow,
    overridden: &HashSet<DateTime<Utc>>,
) -> EventOutcome {
    let span = match event_span(event, resolver) {
        Ok(span) => span,
        Err(e) => {
            return EventOutcome::Skipped {
                reason: e.to_string(),
            };
        }
    };
    let text = EventText::of(event);
    let uid = event.uid();

    let single = || {
        let end = span.end.unwrap_or(span.start);
        if window.overlaps(span.start, end) {
            vec![text.occurrence(uid.to_string(), span.start, span.end)]
        } else {
            Vec::new()
        }
    };

    let Some(rrule) = event.property_value("RRULE") else {
        return EventOutcome::Expanded(single());
    };
    let rule = match rrule.parse::<RecurrenceRule>() {
        Ok(rule) => rule,
        Err(e) => {
            return EventOutcome::Fallback {
                events: single(),
                reason: e.to_string(),
            };
        }
    };

    let duration = span.end.map_or_else(Duration::zero, |end| end - span.start);
    let exdates = excluded_instants(event, resolver);

    let mut events = Vec::new();
    for local in rule.occurrences(span.dtstart.local()) {
        let start = match &span.dtstart {
            IcsDateTime::Zoned { tzid, .. } => match resolver.local_to_utc(tzid, local) {
                Ok(start) => start,
                Err(e) => return EventOutcome::Skipped { reason: e.to_string() },
            },
            _ => local.and_utc(),
        };

        if rule.is_past_local_until(local)
            || rule.utc_until().is_some_and(|until| start.naive_utc() > until)
            || start > window.end
        {
            break;
        }
        if exdates.contains(&start) || overridden.contains(&start) {
            continue;
        }

        let Some(end) = start.checked_add_signed(duration) else {
            break;
        };
        if window.overlaps(start, end) {
            events.push(text.occurrence(instance_uid(uid, start), start, Some(end)));
        }
    }

    EventOutcome::Expanded(events)
}

/// EXDATE instants of an event; unparseable entries are logged and ignored.
fn excluded_instants(event: &Component, resolver: &TimeZoneResolver<'_>) -> HashSet<DateTime<Utc>> {
    let mut instants = HashSet::new();
    for prop in event.properties_named("EXDATE") {
        let values = match parse_date_time_list(prop) {
            Ok(values) => values,
            Err(e) => {
                warn!(uid = event.uid(), error = %e, "Ignoring EXDATE");
                continue;
            }
        };
        for value in values {
            match value.to_utc(resolver) {
                Ok(instant) => {
                    instants.insert(instant);
                }
                Err(e) => warn!(uid = event.uid(), error = %e, "Ignoring EXDATE"),
            }
        }
    }
    instants
}

/// Expands every VEVENT into occurrences overlapping `window`.
///
/// Events carrying RECURRENCE-ID are exceptions to the master with the same
/// UID: the master's generated instance at that instant is suppressed, and
/// the exception itself is emitted unless it is CANCELLED. Output is sorted
/// by start.
pub fn expand_calendar(events: &[Component], resolver: &TimeZoneResolver<'_>, window: &TimeWindow) -> Expansion {
    let mut expansion = Expansion::default();
    let mut overrides: HashMap<&str, HashSet<DateTime<Utc>>> = HashMap::new();
    let mut masters = Vec::new();

    for event in events {
        match recurrence_id(event, resolver) {
            None => masters.push(event),
            Some(Ok(rid)) => {
                overrides.entry(event.uid()).or_default().insert(rid);
                if is_cancelled(event) {
                    continue;
                }
                match event_span(event, resolver) {
                    Ok(span) => {
                        let end = span.end.unwrap_or(span.start);
                        if window.overlaps(span.start, end) {
                            let text = EventText::of(event);
                            expansion
                                .events
                                .push(text.occurrence(instance_uid(event.uid(), rid), span.start, span.end));
                        }
                    }
                    Err(e) => expansion.record(event.uid(), IssueKind::Skipped, e.to_string()),
                }
            }
            Some(Err(e)) => expansion.record(event.uid(), IssueKind::Skipped, e.to_string()),
        }
    }

    let none = HashSet::new();
    for event in masters {
        let overridden = overrides.get(event.uid()).unwrap_or(&none);
        match expand_event(event, resolver, window, overridden) {
            EventOutcome::Expanded(events) => expansion.events.extend(events),
            EventOutcome::Fallback { events, reason } => {
                expansion.events.extend(events);
                expansion.record(event.uid(), IssueKind::RecurrenceIgnored, reason);
            }
            EventOutcome::Skipped { reason } => {
                expansion.record(event.uid(), IssueKind::Skipped, reason);
            }
        }
    }

    expansion.events.sort_by(|a, b| a.start.cmp(&b.start));
    debug!(
        occurrences = expansion.events.len(),
        issues = expansion.issues.len(),
        "Expanded calendar"
    );
    expansion
}

impl Expansion {
    fn record(&mut self, uid: &str, kind: IssueKind, message: String) {
        warn!(uid, ?kind, %message, "Event issue");
        self.issues.push(EventIssue {
            uid: uid.to_string(),
            kind,
            message,
        });
    }
}

/// Builds the unexpanded record for one VEVENT.
///
/// # Errors
///
/// Fails when DTSTART is missing or cannot be resolved; callers skip that
/// event.
pub fn parse_unexpanded_event(event: &Component, resolver: &TimeZoneResolver<'_>) -> IcsResult<UnexpandedEvent> {
    let span = event_span(event, resolver)?;
    let text = EventText::of(event);

    Ok(UnexpandedEvent {
        uid: event.uid().to_string(),
        start: format_instant(span.start),
        end: span.end.map(format_instant),
        summary: text.summary,
        description: text.description,
        location: text.location,
        source: text.source,
        recurring: event.property("RRULE").is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_ics;
    use crate::timezone::{build_time_zone_data, create_time_zone_resolver};

    fn calendar(body: &str) -> Vec<Component> {
        parse_ics(&format!("BEGIN:VCALENDAR\nVERSION:2.0\n{body}END:VCALENDAR\n"))
            .unwrap()
            .events
    }

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::parse(start, end).unwrap()
    }

    fn expand(body: &str, start: &str, end: &str) -> Expansion {
        let events = calendar(body);
        let data = HashMap::new();
        let resolver = create_time_zone_resolver(&data);
        expand_calendar(&events, &resolver, &window(start, end))
    }

    fn starts(expansion: &Expansion) -> Vec<&str> {
        expansion.events.iter().map(|e| e.start.as_str()).collect()
    }

    #[test]
    fn single_event_in_range() {
        let result = expand(
            "BEGIN:VEVENT\nUID:one\nDTSTART:20250110T090000Z\nDTEND:20250110T100000Z\n\
             SUMMARY:Planning\\, Q1\nLOCATION:Room 4\nX-MCP-SOURCE:work\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        assert_eq!(
            result.events,
            vec![ExpandedEvent {
                uid: "one".to_string(),
                start: "2025-01-10T09:00:00.000Z".to_string(),
                end: Some("2025-01-10T10:00:00.000Z".to_string()),
                summary: "Planning, Q1".to_string(),
                description: None,
                location: Some("Room 4".to_string()),
                source: Some("work".to_string()),
            }]
        );
        assert!(result.issues.is_empty());
    }

    #[test]
    fn range_boundaries_are_inclusive() {
        let body = "BEGIN:VEVENT\nUID:touch\nDTSTART:20250110T090000Z\nDTEND:20250110T100000Z\nEND:VEVENT\n";
        // Event ends exactly at range start
        assert_eq!(expand(body, "2025-01-10T10:00:00Z", "2025-01-11T00:00:00Z").events.len(), 1);
        // Event starts exactly at range end
        assert_eq!(expand(body, "2025-01-09T00:00:00Z", "2025-01-10T09:00:00Z").events.len(), 1);
        // Strictly outside
        assert!(expand(body, "2025-01-10T10:00:01Z", "2025-01-11T00:00:00Z").events.is_empty());
    }

    #[test]
    fn missing_dtstart_is_skipped_not_fatal() {
        let result = expand(
            "BEGIN:VEVENT\nUID:bad\nSUMMARY:No start\nEND:VEVENT\n\
             BEGIN:VEVENT\nUID:good\nDTSTART:20250110T090000Z\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].uid, "good");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].uid, "bad");
        assert_eq!(result.issues[0].kind, IssueKind::Skipped);
    }

    #[test]
    fn unknown_tzid_skips_only_that_event() {
        let result = expand(
            "BEGIN:VEVENT\nUID:mars\nDTSTART;TZID=Mars/Olympus:20250110T090000\nEND:VEVENT\n\
             BEGIN:VEVENT\nUID:earth\nDTSTART;TZID=Europe/Paris:20250110T090000\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        assert_eq!(starts(&result), vec!["2025-01-10T08:00:00.000Z"]);
        assert!(result.issues[0].message.contains("Mars/Olympus"));
    }

    #[test]
    fn weekly_with_exdate_and_count() {
        let result = expand(
            "BEGIN:VEVENT\nUID:weekly\nDTSTART:20250106T100000Z\nDTEND:20250106T103000Z\n\
             RRULE:FREQ=WEEKLY;COUNT=4\nEXDATE:20250113T100000Z\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-12-31T00:00:00Z",
        );
        // COUNT includes the excluded instance
        assert_eq!(
            starts(&result),
            vec![
                "2025-01-06T10:00:00.000Z",
                "2025-01-20T10:00:00.000Z",
                "2025-01-27T10:00:00.000Z"
            ]
        );
        assert_eq!(result.events[1].uid, "weekly_1737367200000");
        assert_eq!(result.events[1].end.as_deref(), Some("2025-01-20T10:30:00.000Z"));
    }

    #[test]
    fn exdate_matches_by_instant_across_tzids() {
        let result = expand(
            "BEGIN:VEVENT\nUID:daily\nDTSTART;TZID=Europe/Berlin:20250106T090000\n\
             RRULE:FREQ=DAILY;COUNT=3\nEXDATE:20250107T080000Z\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        assert_eq!(
            starts(&result),
            vec!["2025-01-06T08:00:00.000Z", "2025-01-08T08:00:00.000Z"]
        );
    }

    #[test]
    fn recurring_wall_time_survives_dst() {
        let result = expand(
            "BEGIN:VEVENT\nUID:standup\nDTSTART;TZID=Europe/Berlin:20250324T090000\n\
             RRULE:FREQ=WEEKLY\nEND:VEVENT\n",
            "2025-03-24T00:00:00Z",
            "2025-04-01T00:00:00Z",
        );
        assert_eq!(
            starts(&result),
            vec!["2025-03-24T08:00:00.000Z", "2025-03-31T07:00:00.000Z"]
        );
    }

    #[test]
    fn until_stops_generation() {
        let result = expand(
            "BEGIN:VEVENT\nUID:until\nDTSTART:20250101T120000Z\n\
             RRULE:FREQ=DAILY;UNTIL=20250103T120000Z\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        assert_eq!(result.events.len(), 3);
    }

    #[test]
    fn occurrences_before_range_are_not_emitted() {
        let result = expand(
            "BEGIN:VEVENT\nUID:old\nDTSTART:20200101T120000Z\nDTEND:20200101T130000Z\n\
             RRULE:FREQ=MONTHLY\nEND:VEVENT\n",
            "2025-03-01T00:00:00Z",
            "2025-05-01T00:00:00Z",
        );
        assert_eq!(
            starts(&result),
            vec!["2025-03-01T12:00:00.000Z", "2025-04-01T12:00:00.000Z"]
        );
    }

    #[test]
    fn malformed_rrule_falls_back_to_master() {
        let result = expand(
            "BEGIN:VEVENT\nUID:broken\nDTSTART:20250110T090000Z\nRRULE:FREQ=SOMETIMES\nEND:VEVENT\n\
             BEGIN:VEVENT\nUID:fine\nDTSTART:20250111T090000Z\nRRULE:FREQ=DAILY;COUNT=2\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        let uids: Vec<_> = result.events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["broken", "fine_1736586000000", "fine_1736672400000"]);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::RecurrenceIgnored);
    }

    #[test]
    fn cancelled_and_modified_overrides() {
        let result = expand(
            "BEGIN:VEVENT\nUID:series\nDTSTART:20250106T100000Z\nDTEND:20250106T110000Z\n\
             SUMMARY:Sync\nRRULE:FREQ=DAILY;COUNT=3\nEND:VEVENT\n\
             BEGIN:VEVENT\nUID:series\nRECURRENCE-ID;TZID=Europe/London:20250107T100000\n\
             STATUS:CANCELLED\nDTSTART:20250107T100000Z\nEND:VEVENT\n\
             BEGIN:VEVENT\nUID:series\nRECURRENCE-ID:20250108T100000Z\n\
             DTSTART:20250108T150000Z\nDTEND:20250108T160000Z\nSUMMARY:Sync (moved)\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        let summary: Vec<_> = result
            .events
            .iter()
            .map(|e| (e.start.as_str(), e.summary.as_str(), e.uid.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("2025-01-06T10:00:00.000Z", "Sync", "series_1736157600000"),
                ("2025-01-08T15:00:00.000Z", "Sync (moved)", "series_1736330400000"),
            ]
        );
    }

    #[test]
    fn duration_provides_end() {
        let result = expand(
            "BEGIN:VEVENT\nUID:dur\nDTSTART:20250110T090000Z\nDURATION:PT45M\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        assert_eq!(result.events[0].end.as_deref(), Some("2025-01-10T09:45:00.000Z"));
    }

    #[test]
    fn oversized_duration_skips_only_that_event() {
        let body = "BEGIN:VEVENT\nUID:forever\nDTSTART:20250110T090000Z\nDURATION:P200000000D\nEND:VEVENT\n\
                    BEGIN:VEVENT\nUID:lunch\nDTSTART:20250110T120000Z\nDURATION:PT1H\nEND:VEVENT\n";
        let result = expand(body, "2025-01-01T00:00:00Z", "2025-01-31T00:00:00Z");

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].uid, "lunch");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].uid, "forever");
        assert_eq!(result.issues[0].kind, IssueKind::Skipped);

        let events = calendar(body);
        let data = HashMap::new();
        let resolver = create_time_zone_resolver(&data);
        assert!(matches!(
            parse_unexpanded_event(&events[0], &resolver),
            Err(IcsError::InvalidDuration { .. })
        ));
        assert!(parse_unexpanded_event(&events[1], &resolver).is_ok());
    }

    #[test]
    fn recurring_instances_always_have_end() {
        let result = expand(
            "BEGIN:VEVENT\nUID:noend\nDTSTART;VALUE=DATE:20250110\nRRULE:FREQ=YEARLY;COUNT=2\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2027-01-31T00:00:00Z",
        );
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[1].start, "2026-01-10T00:00:00.000Z");
        assert_eq!(result.events[1].end.as_deref(), Some("2026-01-10T00:00:00.000Z"));
    }

    #[test]
    fn output_is_sorted_across_events() {
        let result = expand(
            "BEGIN:VEVENT\nUID:b\nDTSTART:20250112T090000Z\nEND:VEVENT\n\
             BEGIN:VEVENT\nUID:a\nDTSTART:20250111T090000Z\nRRULE:FREQ=DAILY;COUNT=3\nEND:VEVENT\n",
            "2025-01-01T00:00:00Z",
            "2025-01-31T00:00:00Z",
        );
        let mut sorted = starts(&result);
        sorted.sort();
        assert_eq!(starts(&result), sorted);
        assert_eq!(result.events.len(), 4);
    }

    #[test]
    fn unexpanded_event_record() {
        let events = calendar(
            "BEGIN:VEVENT\nUID:u\nDTSTART:20250110T090000Z\nSUMMARY:Design review\n\
             DESCRIPTION:Line one\\nLine two\nRRULE:FREQ=WEEKLY\nEND:VEVENT\n",
        );
        let data = HashMap::new();
        let resolver = create_time_zone_resolver(&data);
        let record = parse_unexpanded_event(&events[0], &resolver).unwrap();

        assert!(record.recurring);
        assert_eq!(record.description.as_deref(), Some("Line one\nLine two"));
        assert!(record.matches("REVIEW"));
        assert!(record.matches("line two"));
        assert!(!record.matches("standup"));
    }

    #[test]
    fn unexpanded_event_requires_dtstart() {
        let events = calendar("BEGIN:VEVENT\nUID:u\nEND:VEVENT\n");
        let data = HashMap::new();
        let resolver = create_time_zone_resolver(&data);
        assert!(matches!(
            parse_unexpanded_event(&events[0], &resolver),
            Err(IcsError::MissingProperty { name: "DTSTART" })
        ));
    }

    #[test]
    fn resolves_through_calendar_timezones() {
        let ics = "BEGIN:VCALENDAR\n\
            BEGIN:VTIMEZONE\nTZID:Office\n\
            BEGIN:STANDARD\nTZOFFSETFROM:+0100\nTZOFFSETTO:+0100\nDTSTART:19700101T000000\nEND:STANDARD\n\
            END:VTIMEZONE\n\
            BEGIN:VEVENT\nUID:x\nDTSTART;TZID=Office:20250110T090000\nEND:VEVENT\n\
            END:VCALENDAR\n";
        let parsed = parse_ics(ics).unwrap();
        let data = build_time_zone_data(&parsed.timezones);
        let resolver = create_time_zone_resolver(&data);
        let result = expand_calendar(
            &parsed.events,
            &resolver,
            &window("2025-01-01T00:00:00Z", "2025-01-31T00:00:00Z"),
        );
        assert_eq!(starts(&result), vec!["2025-01-10T08:00:00.000Z"]);
    }
}
