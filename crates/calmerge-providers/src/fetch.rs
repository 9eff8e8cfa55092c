//! ICS fetching.
//!
//! [`IcsFetcher`] is the seam between the refresh logic and the network.
//! [`HttpFetcher`] is the real implementation; [`StaticFetcher`] serves
//! canned responses for tests and offline runs.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, trace, warn};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::source::CalendarSource;

/// Default timeout for a single fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent for HTTP requests.
pub const DEFAULT_USER_AGENT: &str = concat!("calmerge/", env!("CARGO_PKG_VERSION"));

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retrieves the raw ICS text of a calendar source.
pub trait IcsFetcher: Send + Sync {
    /// Fetches the current ICS text for `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] tagged with the source name.
    fn fetch<'a>(&'a self, source: &'a CalendarSource) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Fetches ICS feeds over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with the given per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::new(ProviderErrorCode::Internal, format!("cannot build HTTP client: {e}"))
                    .caused_by(e)
            })?;

        Ok(Self { client, timeout })
    }

    async fn get(&self, source: &CalendarSource) -> ProviderResult<String> {
        trace!(source = source.name(), url = %source.url(), "Sending request");

        let response = self
            .client
            .get(source.url().clone())
            .header("Accept", "text/calendar, */*;q=0.5")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        trace!(status = %status, "Received response");

        if status.is_success() {
            return response
                .text()
                .await
                .map_err(|e| ProviderError::network(format!("reading body failed: {e}")).caused_by(e));
        }

        let body = response.text().await.unwrap_or_default();
        let error = status_error(status, &body);
        if error.code() == ProviderErrorCode::UnexpectedStatus {
            warn!(status = %status, "Unexpected response status");
        }
        Err(error)
    }

    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        let message = if error.is_timeout() {
            format!("no response within {}s", self.timeout.as_secs())
        } else {
            format!("request failed: {error}")
        };
        ProviderError::network(message).caused_by(error)
    }
}

impl IcsFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, source: &'a CalendarSource) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let result = self.get(source).await;
            match &result {
                Ok(body) => debug!(source = source.name(), bytes = body.len(), "Fetched calendar"),
                Err(e) => debug!(source = source.name(), error = %e, "Fetch failed"),
            }
            result.map_err(|e| e.for_source(source.name()))
        })
    }
}

/// Maps a non-success HTTP status to a provider error. Server and
/// unexpected-status errors keep the first 200 characters of the body.
pub fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let code = ProviderErrorCode::for_status(status.as_u16());
    let message = match code {
        ProviderErrorCode::Unauthorized => "feed requires credentials".to_string(),
        ProviderErrorCode::Forbidden => "access to feed denied".to_string(),
        ProviderErrorCode::NotFound => "feed not found".to_string(),
        ProviderErrorCode::RateLimited => "rate limited by server".to_string(),
        _ => {
            let snippet: String = body.chars().take(200).collect();
            format!("HTTP {status}: {snippet}")
        }
    };
    ProviderError::new(code, message)
}

/// Serves canned responses keyed by source name.
///
/// Unknown sources fail with a network error. Every call is counted, and an
/// optional delay simulates a slow server.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, ProviderResult<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for the named source.
    pub fn with_body(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(name.into(), Ok(body.into()));
        self
    }

    /// Fails the named source with `error`.
    pub fn with_error(mut self, name: impl Into<String>, error: ProviderError) -> Self {
        self.responses.insert(name.into(), Err(error));
        self
    }

    /// Waits `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IcsFetcher for StaticFetcher {
    fn fetch<'a>(&'a self, source: &'a CalendarSource) -> BoxFuture<'a, ProviderResult<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = match self.responses.get(source.name()) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(error)) => Err(error.duplicate()),
            None => Err(ProviderError::network("connection refused")),
        };
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result.map_err(|e| e.for_source(source.name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> CalendarSource {
        CalendarSource::new(name, "https://example.com/cal.ics").unwrap()
    }

    #[test]
    fn status_mapping() {
        let code = |status| status_error(status, "").code();
        assert_eq!(code(StatusCode::NOT_FOUND), ProviderErrorCode::NotFound);
        assert_eq!(code(StatusCode::UNAUTHORIZED), ProviderErrorCode::Unauthorized);
        assert_eq!(code(StatusCode::FORBIDDEN), ProviderErrorCode::Forbidden);
        assert_eq!(code(StatusCode::TOO_MANY_REQUESTS), ProviderErrorCode::RateLimited);
        assert_eq!(code(StatusCode::BAD_GATEWAY), ProviderErrorCode::ServerError);
        assert_eq!(code(StatusCode::SERVICE_UNAVAILABLE), ProviderErrorCode::ServerError);
        assert_eq!(code(StatusCode::IM_A_TEAPOT), ProviderErrorCode::UnexpectedStatus);
        assert_eq!(code(StatusCode::MOVED_PERMANENTLY), ProviderErrorCode::UnexpectedStatus);
    }

    #[test]
    fn server_error_body_is_truncated() {
        let body = "x".repeat(1000);
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(err.message().len() < 300);
    }

    #[test]
    fn http_fetcher_builds() {
        assert!(HttpFetcher::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).is_ok());
        assert!(DEFAULT_USER_AGENT.starts_with("calmerge/"));
    }

    #[tokio::test]
    async fn static_fetcher_serves_and_fails() {
        let fetcher = StaticFetcher::new()
            .with_body("work", "BEGIN:VCALENDAR\nEND:VCALENDAR\n")
            .with_error("home", ProviderError::new(ProviderErrorCode::NotFound, "gone"));

        assert!(fetcher.fetch(&source("work")).await.unwrap().starts_with("BEGIN"));

        let err = fetcher.fetch(&source("home")).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert_eq!(err.source_name(), Some("home"));

        let err = fetcher.fetch(&source("other")).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::Network);

        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn static_fetcher_delay() {
        let fetcher = StaticFetcher::new()
            .with_body("work", "x")
            .with_delay(Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        fetcher.fetch(&source("work")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
