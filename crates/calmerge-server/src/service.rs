//! The calendar service: composition root for fetching, caching and queries.

use std::sync::Arc;

use calmerge_core::{
    EventIssue, ExpandedEvent, TimeWindow, UnexpandedEvent, expand_in, get_unexpanded_events,
    search_events,
};
use calmerge_providers::{CalendarSource, HttpFetcher, IcsFetcher};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{CalendarAggregator, CombinedCalendar};
use crate::cache::CacheStore;
use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::refresh::RefreshCoordinator;

/// Events plus the per-source errors of the snapshot they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsResponse<E> {
    pub events: Vec<E>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<EventIssue>,
}

/// Owns the sources, the cache and the refresh coordinator.
///
/// Build it once at startup, call [`start`](Self::start), and call
/// [`shutdown`](Self::shutdown) before exiting.
pub struct CalendarService {
    config: ServerConfig,
    aggregator: Arc<CalendarAggregator>,
    coordinator: RefreshCoordinator<CombinedCalendar>,
}

impl CalendarService {
    /// Creates a service fetching over HTTP.
    pub fn new(config: ServerConfig, sources: Vec<CalendarSource>) -> ServerResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout, &config.user_agent)?;
        Ok(Self::with_fetcher(config, sources, Arc::new(fetcher)))
    }

    /// Creates a service with a custom fetcher.
    pub fn with_fetcher(
        config: ServerConfig,
        sources: Vec<CalendarSource>,
        fetcher: Arc<dyn IcsFetcher>,
    ) -> Self {
        let cache = CacheStore::new(&config.cache_dir);
        let aggregator = Arc::new(CalendarAggregator::new(sources, fetcher, cache));

        let refresher = Arc::clone(&aggregator);
        let coordinator = RefreshCoordinator::new(move || {
            let aggregator = Arc::clone(&refresher);
            async move { aggregator.refresh_all().await }
        });

        Self {
            config,
            aggregator,
            coordinator,
        }
    }

    /// Runs the first refresh and starts the periodic refresh if configured.
    pub async fn start(&self) -> ServerResult<Arc<CombinedCalendar>> {
        info!(
            sources = self.aggregator.sources().len(),
            cache_dir = %self.config.cache_dir.display(),
            "Starting calendar service"
        );
        let snapshot = self.coordinator.refresh().await?;
        if let Some(interval) = self.config.refresh_interval {
            self.coordinator.spawn_periodic(interval).await?;
        }
        Ok(snapshot)
    }

    pub fn sources(&self) -> &[CalendarSource] {
        self.aggregator.sources()
    }

    /// Returns the latest snapshot, refreshing first if there is none.
    pub async fn snapshot(&self) -> ServerResult<Arc<CombinedCalendar>> {
        self.coordinator.get_or_refresh().await
    }

    /// Forces a refresh, joining one already in flight.
    pub async fn refresh(&self) -> ServerResult<Arc<CombinedCalendar>> {
        self.coordinator.refresh().await
    }

    /// Occurrences overlapping `window`, sorted by start.
    pub async fn events_between(&self, window: &TimeWindow) -> ServerResult<EventsResponse<ExpandedEvent>> {
        let snapshot = self.snapshot().await?;
        let expansion = expand_in(&snapshot.prepared, window);
        Ok(EventsResponse {
            events: expansion.events,
            errors: snapshot.errors.clone(),
            issues: expansion.issues,
        })
    }

    /// One record per event definition.
    pub async fn unexpanded_events(&self) -> ServerResult<EventsResponse<UnexpandedEvent>> {
        let snapshot = self.snapshot().await?;
        Ok(EventsResponse {
            events: get_unexpanded_events(&snapshot.prepared),
            errors: snapshot.errors.clone(),
            issues: Vec::new(),
        })
    }

    /// Event definitions matching `query`, sorted by start.
    pub async fn search(&self, query: &str) -> ServerResult<EventsResponse<UnexpandedEvent>> {
        let snapshot = self.snapshot().await?;
        Ok(EventsResponse {
            events: search_events(&snapshot.prepared, query),
            errors: snapshot.errors.clone(),
            issues: Vec::new(),
        })
    }

    /// Stops background refreshes and waits for the one in flight.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}
