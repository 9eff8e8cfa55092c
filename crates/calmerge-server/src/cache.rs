//! File-backed cache of prepared calendars.
//!
//! Each source owns one JSON file holding the serialized [`PreparedIcs`]
//! from its last successful fetch. The file name is derived from the source
//! URL, so sources never share a file.

use std::path::PathBuf;

use calmerge_core::{PreparedIcs, deserialize, serialize};
use calmerge_providers::CalendarSource;
use tokio::fs;
use tracing::{debug, trace};

use crate::error::ServerResult;

/// Returns the cache file name for a source URL: every non-alphanumeric
/// character becomes `_`, and `.json` is appended.
pub fn cache_file_name(url: &str) -> String {
    let mut name: String = url
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    name.push_str(".json");
    name
}

/// Per-source cache files under one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache file path for `source`.
    pub fn path_for(&self, source: &CalendarSource) -> PathBuf {
        self.dir.join(cache_file_name(source.configured_url()))
    }

    /// Persists `prepared` for `source`.
    ///
    /// The data is written to a temporary sibling and renamed into place, so
    /// readers never see a partial file.
    pub async fn write(&self, source: &CalendarSource, prepared: &PreparedIcs) -> ServerResult<PathBuf> {
        let path = self.path_for(source);
        let data = serialize(prepared)?;

        fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;

        debug!(source = source.name(), path = %path.display(), bytes = data.len(), "Wrote cache file");
        Ok(path)
    }

    /// Loads the last persisted calendar for `source`.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing, unreadable or not a valid prepared
    /// calendar.
    pub async fn read(&self, source: &CalendarSource) -> ServerResult<PreparedIcs> {
        let path = self.path_for(source);
        trace!(source = source.name(), path = %path.display(), "Reading cache file");

        let data = fs::read_to_string(&path).await?;
        let prepared = deserialize(&data)?;
        debug!(source = source.name(), events = prepared.events.len(), "Loaded cache file");
        Ok(prepared)
    }
}
