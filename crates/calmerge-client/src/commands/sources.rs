//! `sources` command.

use std::io::Write;

use calmerge_server::{CalendarService, SourceStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::write_json;
use crate::error::ClientResult;

#[derive(Debug, Serialize)]
struct SourcesReport<'a> {
    refreshed_at: DateTime<Utc>,
    sources: &'a [SourceStatus],
    errors: &'a [String],
}

/// Prints one status per source from the latest refresh.
pub async fn sources<W: Write>(service: &CalendarService, out: &mut W) -> ClientResult<()> {
    let snapshot = service.snapshot().await?;
    let report = SourcesReport {
        refreshed_at: snapshot.refreshed_at,
        sources: &snapshot.sources,
        errors: &snapshot.errors,
    };
    write_json(out, &report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calmerge_providers::{CalendarSource, StaticFetcher};
    use calmerge_server::ServerConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn reports_each_source() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            CalendarSource::new("home", "https://example.com/home.ics").unwrap(),
            CalendarSource::new("work", "https://example.com/work.ics").unwrap(),
        ];
        let fetcher = StaticFetcher::new().with_body("work", "BEGIN:VCALENDAR\nEND:VCALENDAR\n");
        let service =
            CalendarService::with_fetcher(ServerConfig::new(dir.path()), sources, Arc::new(fetcher));

        let mut out = Vec::new();
        super::sources(&service, &mut out).await.unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["sources"][0]["name"], "home");
        assert_eq!(json["sources"][0]["state"], "failed");
        assert_eq!(json["sources"][1]["state"], "fresh");
        assert_eq!(json["sources"][1]["events"], 0);
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);
    }
}
