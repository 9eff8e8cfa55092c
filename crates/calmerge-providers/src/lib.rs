//! Calendar sources and ICS fetching.
//!
//! - [`CalendarSource`] - A named ICS feed URL, read from `CALENDAR_<NAME>` variables
//! - [`IcsFetcher`] - The trait the refresh logic fetches through
//! - [`HttpFetcher`] - reqwest-backed fetcher
//! - [`StaticFetcher`] - Canned responses for tests
//! - [`ProviderError`] - Error types for source and fetch operations

pub mod error;
pub mod fetch;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use fetch::{
    BoxFuture, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpFetcher, IcsFetcher, StaticFetcher,
    status_error,
};
pub use source::{CalendarSource, SOURCE_VAR_PREFIX, sources_from_vars};
