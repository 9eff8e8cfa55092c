//! Prepared calendars: the cached, serializable parse result.
//!
//! A [`PreparedIcs`] holds the VEVENT components and timezone rules of one
//! or more sources. It round-trips through JSON losslessly; on the wire the
//! timezone map is a list of `[tzid, data]` pairs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IcsResult;
use crate::expand::{Expansion, SOURCE_PROPERTY, UnexpandedEvent, expand_calendar, parse_unexpanded_event};
use crate::ics::{Component, Property, parse_ics};
use crate::time::TimeWindow;
use crate::timezone::{TimeZoneData, build_time_zone_data, create_time_zone_resolver};

/// Parsed events plus the timezone rules needed to place them in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedIcs {
    pub events: Vec<Component>,
    #[serde(rename = "tzData", with = "tz_pairs")]
    pub tz_data: HashMap<String, TimeZoneData>,
}

/// Serializes the timezone map as `[[tzid, data], ...]`, sorted by TZID.
mod tz_pairs {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::timezone::TimeZoneData;

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, TimeZoneData>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut pairs: Vec<(&String, &TimeZoneData)> = map.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, TimeZoneData>, D::Error> {
        let pairs = Vec::<(String, TimeZoneData)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

impl PreparedIcs {
    /// Sets the source tag on every event, replacing any existing tag.
    pub fn tag_source(&mut self, source: &str) {
        for event in &mut self.events {
            event.set_property(Property::new(SOURCE_PROPERTY, source));
        }
    }

    /// Appends another prepared calendar. On TZID collision `other` wins.
    pub fn merge(&mut self, other: PreparedIcs) {
        self.events.extend(other.events);
        self.tz_data.extend(other.tz_data);
    }
}

/// Parses ICS text and builds its timezone rules.
///
/// # Errors
///
/// Fails only when the text has no VCALENDAR; per-event problems surface
/// later, at query time.
pub fn prepare(ics: &str) -> IcsResult<PreparedIcs> {
    let parsed = parse_ics(ics)?;
    if !parsed.warnings.is_empty() {
        warn!(count = parsed.warnings.len(), "Calendar parsed with warnings");
    }

    let tz_data = build_time_zone_data(&parsed.timezones);
    debug!(
        events = parsed.events.len(),
        timezones = tz_data.len(),
        "Prepared calendar"
    );

    Ok(PreparedIcs {
        events: parsed.events,
        tz_data,
    })
}

/// Serializes a prepared calendar to its JSON wire form.
pub fn serialize(prepared: &PreparedIcs) -> IcsResult<String> {
    Ok(serde_json::to_string(prepared)?)
}

/// Reads a prepared calendar back from its JSON wire form.
pub fn deserialize(data: &str) -> IcsResult<PreparedIcs> {
    Ok(serde_json::from_str(data)?)
}

/// Expands all events overlapping `[start, end]` (RFC 3339 strings).
///
/// # Errors
///
/// Returns [`crate::IcsError::InvalidRange`] when either bound does not
/// parse or `start` is after `end`.
pub fn get_events_between(prepared: &PreparedIcs, start: &str, end: &str) -> IcsResult<Expansion> {
    let window = TimeWindow::parse(start, end)?;
    Ok(expand_in(prepared, &window))
}

/// Expands all events overlapping `window`.
pub fn expand_in(prepared: &PreparedIcs, window: &TimeWindow) -> Expansion {
    let resolver = create_time_zone_resolver(&prepared.tz_data);
    expand_calendar(&prepared.events, &resolver, window)
}

/// Returns one record per VEVENT, skipping events whose start cannot be
/// resolved.
pub fn get_unexpanded_events(prepared: &PreparedIcs) -> Vec<UnexpandedEvent> {
    let resolver = create_time_zone_resolver(&prepared.tz_data);
    prepared
        .events
        .iter()
        .filter_map(|event| match parse_unexpanded_event(event, &resolver) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(uid = event.uid(), error = %e, "Skipping event");
                None
            }
        })
        .collect()
}

/// Returns events whose summary, description or location contains `query`
/// (case-insensitive), sorted by start.
pub fn search_events(prepared: &PreparedIcs, query: &str) -> Vec<UnexpandedEvent> {
    let mut found: Vec<UnexpandedEvent> = get_unexpanded_events(prepared)
        .into_iter()
        .filter(|event| event.matches(query))
        .collect();
    found.sort_by(|a, b| a.start.cmp(&b.start));
    found
}
