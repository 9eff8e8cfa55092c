//! Calendar source configuration.
//!
//! Sources come from environment variables named `CALENDAR_<NAME>` whose
//! value is the ICS feed URL. The source name is `<NAME>` lower-cased.

use std::fmt;

use tracing::debug;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Prefix of the environment variables that declare calendar sources.
pub const SOURCE_VAR_PREFIX: &str = "CALENDAR_";

/// A named ICS feed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarSource {
    name: String,
    url: Url,
    /// The URL exactly as configured, before `Url` normalization.
    configured: String,
}

impl CalendarSource {
    /// Creates a source from a name and an http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL does not parse or is not
    /// http/https.
    pub fn new(name: impl Into<String>, url: &str) -> ProviderResult<Self> {
        let name = name.into();
        let configured = url.trim().to_string();
        let url = Url::parse(&configured).map_err(|e| {
            ProviderError::configuration(format!("invalid URL '{url}': {e}")).for_source(&name)
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProviderError::configuration(format!(
                "unsupported URL scheme '{}' (expected http or https)",
                url.scheme()
            ))
            .for_source(&name));
        }

        Ok(Self {
            name,
            url,
            configured,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL string as configured; cache files are keyed on it.
    pub fn configured_url(&self) -> &str {
        &self.configured
    }

    /// Reads every `CALENDAR_<NAME>` variable from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when no source is configured or any source is invalid.
    pub fn from_env() -> ProviderResult<Vec<Self>> {
        sources_from_vars(std::env::vars())
    }
}

impl fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Builds calendar sources from `(variable, value)` pairs.
///
/// Variables without the `CALENDAR_` prefix are ignored. The result is
/// sorted by name.
///
/// # Errors
///
/// Returns a configuration error naming the offending variable when a
/// value is not an http(s) URL, when two variables map to the same name,
/// or when no source is configured at all.
pub fn sources_from_vars<I, K, V>(vars: I) -> ProviderResult<Vec<CalendarSource>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut sources = Vec::new();

    for (key, value) in vars {
        let key = key.as_ref();
        let Some(suffix) = key.strip_prefix(SOURCE_VAR_PREFIX) else {
            continue;
        };
        if suffix.is_empty() {
            return Err(ProviderError::configuration(format!(
                "{key} has no calendar name after the prefix"
            )));
        }

        let source = CalendarSource::new(suffix.to_lowercase(), value.as_ref()).map_err(|e| {
            ProviderError::configuration(format!("{key}: {}", e.message()))
                .for_source(suffix.to_lowercase())
        })?;
        debug!(name = source.name(), url = %source.url(), "Configured calendar source");
        sources.push(source);
    }

    if sources.is_empty() {
        return Err(ProviderError::configuration(format!(
            "no calendar sources configured; set {SOURCE_VAR_PREFIX}<NAME>=<ics url>"
        )));
    }

    sources.sort();
    if let Some(pair) = sources.windows(2).find(|pair| pair[0].name == pair[1].name) {
        return Err(ProviderError::configuration(format!(
            "calendar name '{}' is configured more than once",
            pair[0].name
        )));
    }

    Ok(sources)
}
