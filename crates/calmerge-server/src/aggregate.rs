//! Multi-source aggregation.
//!
//! Every configured source is refreshed concurrently: fetch, parse, tag,
//! persist. A source whose fetch or parse fails falls back to its cache
//! file; the failure is still reported as an error string. One source
//! failing never affects the others.

use std::sync::Arc;

use calmerge_core::{PreparedIcs, prepare};
use calmerge_providers::{CalendarSource, IcsFetcher};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Result of refreshing one source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRefresh {
    /// Fetched and parsed just now.
    Fresh(PreparedIcs),
    /// The fetch failed; the last cached copy is served instead.
    Cached { prepared: PreparedIcs, error: String },
    /// The fetch failed and no usable cache exists.
    Failed { error: String },
}

impl SourceRefresh {
    fn state(&self) -> SourceState {
        match self {
            Self::Fresh(_) => SourceState::Fresh,
            Self::Cached { .. } => SourceState::Cached,
            Self::Failed { .. } => SourceState::Failed,
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            Self::Fresh(_) => None,
            Self::Cached { error, .. } | Self::Failed { error } => Some(error),
        }
    }
}

/// Where a source's events came from in the last refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Fresh,
    Cached,
    Failed,
}

/// Per-source summary of a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub url: String,
    pub state: SourceState,
    pub events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// All sources merged into one queryable calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCalendar {
    pub prepared: PreparedIcs,
    /// One human-readable string per failed source.
    pub errors: Vec<String>,
    pub sources: Vec<SourceStatus>,
    pub refreshed_at: DateTime<Utc>,
}

impl CombinedCalendar {
    /// Merges per-source results in the given order. On TZID collision the
    /// later source wins.
    pub fn combine(results: impl IntoIterator<Item = (CalendarSource, SourceRefresh)>) -> Self {
        let mut combined = Self {
            prepared: PreparedIcs::default(),
            errors: Vec::new(),
            sources: Vec::new(),
            refreshed_at: Utc::now(),
        };

        for (source, result) in results {
            let state = result.state();
            let error = result.error().map(str::to_string);
            if let Some(error) = &error {
                combined.errors.push(error.clone());
            }

            let events = match result {
                SourceRefresh::Fresh(prepared) | SourceRefresh::Cached { prepared, .. } => {
                    let count = prepared.events.len();
                    combined.prepared.merge(prepared);
                    count
                }
                SourceRefresh::Failed { .. } => 0,
            };

            combined.sources.push(SourceStatus {
                name: source.name().to_string(),
                url: source.configured_url().to_string(),
                state,
                events,
                error,
            });
        }

        combined
    }
}

/// Refreshes a fixed set of sources through a fetcher and a cache store.
pub struct CalendarAggregator {
    sources: Vec<CalendarSource>,
    fetcher: Arc<dyn IcsFetcher>,
    cache: CacheStore,
}

impl CalendarAggregator {
    pub fn new(sources: Vec<CalendarSource>, fetcher: Arc<dyn IcsFetcher>, cache: CacheStore) -> Self {
        Self {
            sources,
            fetcher,
            cache,
        }
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Refreshes one source.
    ///
    /// On success the events are tagged with the source name and persisted;
    /// a failed cache write is logged and does not fail the refresh. On
    /// fetch or parse failure the cache file is read instead.
    pub async fn refresh_source(&self, source: &CalendarSource) -> SourceRefresh {
        let name = source.name();

        let fetched = match self.fetcher.fetch(source).await {
            Ok(text) => {
                prepare(&text).map_err(|e| format!("[{name}] failed to parse calendar: {e}"))
            }
            Err(e) => Err(e.to_string()),
        };

        match fetched {
            Ok(mut prepared) => {
                prepared.tag_source(name);
                if let Err(e) = self.cache.write(source, &prepared).await {
                    warn!(source = name, error = %e, "Failed to write cache file");
                }
                debug!(source = name, events = prepared.events.len(), "Source refreshed");
                SourceRefresh::Fresh(prepared)
            }
            Err(error) => match self.cache.read(source).await {
                Ok(prepared) => {
                    warn!(source = name, %error, "Serving cached calendar");
                    SourceRefresh::Cached { prepared, error }
                }
                Err(cache_error) => {
                    warn!(source = name, %error, %cache_error, "Source unavailable and no usable cache");
                    SourceRefresh::Failed {
                        error: format!("{error} (no usable cache: {cache_error})"),
                    }
                }
            },
        }
    }

    /// Refreshes all sources concurrently and merges the results in source
    /// order.
    pub async fn refresh_all(&self) -> CombinedCalendar {
        let results = join_all(self.sources.iter().map(|source| self.refresh_source(source))).await;
        let combined = CombinedCalendar::combine(self.sources.iter().cloned().zip(results));

        info!(
            sources = self.sources.len(),
            events = combined.prepared.events.len(),
            errors = combined.errors.len(),
            "Calendars refreshed"
        );
        combined
    }
}
