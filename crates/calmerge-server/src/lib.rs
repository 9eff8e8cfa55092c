//! Calendar service: per-source refresh, disk cache fallback, aggregation.
//!
//! This crate provides:
//! - Concurrent refresh of every configured source, with a cache file per source
//! - Fallback to the last cached copy when a fetch or parse fails
//! - A deduplicating [`RefreshCoordinator`] with optional periodic refresh
//! - [`CalendarService`], the composition root the binary builds at startup
//!
//! # Example
//!
//! ```rust,no_run
//! use calmerge_providers::CalendarSource;
//! use calmerge_server::{CalendarService, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sources = CalendarSource::from_env()?;
//!     let service = CalendarService::new(ServerConfig::default(), sources)?;
//!     let snapshot = service.start().await?;
//!     println!("{} events, {} errors", snapshot.prepared.events.len(), snapshot.errors.len());
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

mod aggregate;
mod cache;
mod config;
mod error;
mod refresh;
mod service;

pub use aggregate::{CalendarAggregator, CombinedCalendar, SourceRefresh, SourceState, SourceStatus};
pub use cache::{CacheStore, cache_file_name};
pub use config::{DEFAULT_CACHE_DIR, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use refresh::RefreshCoordinator;
pub use service::{CalendarService, EventsResponse};
