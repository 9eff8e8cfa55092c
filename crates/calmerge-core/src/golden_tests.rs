//! Golden tests for JSON output.
//!
//! These tests use insta for snapshot testing to keep the output shape stable.
//! Run with `cargo insta review` to update snapshots after intentional changes.

use crate::prepared::{get_events_between, prepare, search_events};

/// A week around the 2025 DST change with an exception, an override and an
/// all-day event. Europe/Berlin has no VTIMEZONE here and goes through the
/// IANA fallback.
const TEAM_CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//calmerge//golden//EN\r\n\
BEGIN:VEVENT\r\n\
UID:standup@example.com\r\n\
DTSTART;TZID=Europe/Berlin:20250303T090000\r\n\
DTEND;TZID=Europe/Berlin:20250303T091500\r\n\
RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR\r\n\
EXDATE;TZID=Europe/Berlin:20250328T090000\r\n\
SUMMARY:Standup\r\n\
LOCATION:Huddle room\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:standup@example.com\r\n\
RECURRENCE-ID;TZID=Europe/Berlin:20250326T090000\r\n\
DTSTART;TZID=Europe/Berlin:20250326T100000\r\n\
DTEND;TZID=Europe/Berlin:20250326T101500\r\n\
SUMMARY:Standup (late)\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:release@example.com\r\n\
DTSTART;VALUE=DATE:20250401\r\n\
DTEND;VALUE=DATE:20250402\r\n\
SUMMARY:Release day\r\n\
DESCRIPTION:Ship v2.0\\; then celebrate\\,\r\n  obviously\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

const OFFICE_CALENDAR: &str = "BEGIN:VCALENDAR\n\
BEGIN:VTIMEZONE\n\
TZID:Office\n\
BEGIN:STANDARD\n\
TZOFFSETFROM:+0100\n\
TZOFFSETTO:+0100\n\
DTSTART:19700101T000000\n\
END:STANDARD\n\
END:VTIMEZONE\n\
BEGIN:VEVENT\n\
UID:lunch@example.com\n\
DTSTART;TZID=Office:20250110T120000\n\
SUMMARY:Lunch\n\
END:VEVENT\n\
END:VCALENDAR\n";

#[test]
fn golden_expanded_window() {
    let mut prepared = prepare(TEAM_CALENDAR).unwrap();
    prepared.tag_source("work");

    let expansion =
        get_events_between(&prepared, "2025-03-24T00:00:00Z", "2025-04-02T00:00:00Z").unwrap();
    assert!(expansion.issues.is_empty());

    insta::assert_json_snapshot!("expanded_window", expansion.events);
}

#[test]
fn golden_search_results() {
    let prepared = prepare(TEAM_CALENDAR).unwrap();
    let found = search_events(&prepared, "standup");

    insta::assert_json_snapshot!("search_results", found);
}

#[test]
fn golden_wire_form() {
    let prepared = prepare(OFFICE_CALENDAR).unwrap();

    insta::assert_json_snapshot!("wire_form", prepared);
}
