//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use calmerge_providers::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "cache/calendars";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding one JSON cache file per source.
    pub cache_dir: PathBuf,

    /// Timeout for a single source fetch.
    pub fetch_timeout: Duration,

    /// Interval of the background refresh; `None` disables it.
    pub refresh_interval: Option<Duration>,

    /// User agent sent with every fetch.
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            fetch_timeout: DEFAULT_TIMEOUT,
            refresh_interval: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration with the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Builder: set fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Builder: enable periodic refresh.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Builder: set user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
