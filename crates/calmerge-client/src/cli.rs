//! Command-line interface definition.

use std::path::PathBuf;
use std::time::Duration;

use calmerge_core::{TracingConfig, TracingOutputFormat};
use calmerge_server::{DEFAULT_CACHE_DIR, ServerConfig};
use clap::{Parser, Subcommand, ValueEnum};

/// calmerge - merged view of several ICS calendars
///
/// Sources are read from CALENDAR_<NAME>=<url> environment variables.
#[derive(Debug, Parser)]
#[command(name = "calmerge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// Directory holding the per-source cache files
    #[arg(long, env = "CALMERGE_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Fetch timeout in seconds
    #[arg(long, env = "CALMERGE_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Builds the service configuration from the flags.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.cache_dir).with_fetch_timeout(Duration::from_secs(self.timeout))
    }

    pub fn tracing_config(&self) -> TracingConfig {
        let config = if self.debug {
            TracingConfig::verbose()
        } else {
            TracingConfig::default()
        };
        config.with_format(self.log_format.into())
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List event occurrences in a time range
    Events {
        /// Range start, RFC 3339 (default: now)
        #[arg(long)]
        from: Option<String>,

        /// Range end, RFC 3339 (default: start + 7 days)
        #[arg(long)]
        to: Option<String>,
    },

    /// Search event definitions by summary, description or location
    Search {
        /// Case-insensitive text to look for
        query: String,
    },

    /// Show where each source's events came from
    Sources,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
        }
    }
}
