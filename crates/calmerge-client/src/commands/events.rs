//! `events` and `search` commands.

use std::io::Write;

use calmerge_core::{TimeWindow, parse_instant};
use calmerge_server::CalendarService;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::write_json;
use crate::error::ClientResult;

/// Default length of the `events` window.
pub const DEFAULT_RANGE_DAYS: i64 = 7;

/// Resolves `--from`/`--to` into a window. A missing start is `now`; a
/// missing end is start plus seven days.
pub fn resolve_window(from: Option<&str>, to: Option<&str>, now: DateTime<Utc>) -> ClientResult<TimeWindow> {
    let start = from.map(parse_instant).transpose()?.unwrap_or(now);
    match to {
        Some(to) => Ok(TimeWindow::new(start, parse_instant(to)?)?),
        None => Ok(TimeWindow::from_now(start, Duration::days(DEFAULT_RANGE_DAYS))),
    }
}

/// Prints occurrences in the window.
pub async fn events<W: Write>(
    service: &CalendarService,
    from: Option<&str>,
    to: Option<&str>,
    out: &mut W,
) -> ClientResult<()> {
    let window = resolve_window(from, to, Utc::now())?;
    debug!(start = %window.start, end = %window.end, "Listing events");

    let response = service.events_between(&window).await?;
    write_json(out, &response)
}

/// Prints event definitions matching `query`.
pub async fn search<W: Write>(service: &CalendarService, query: &str, out: &mut W) -> ClientResult<()> {
    let response = service.search(query).await?;
    debug!(query, found = response.events.len(), "Searched events");
    write_json(out, &response)
}
