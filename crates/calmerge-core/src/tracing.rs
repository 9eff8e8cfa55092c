//! Log setup for the calmerge binary and anything embedding the service.
//!
//! Logs go to stderr; stdout carries the JSON output of commands. When
//! `RUST_LOG` is set it replaces the configured level.

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, ParseError};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{Layer, fmt};

/// Errors from [`init_tracing`].
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// One line per event.
    #[default]
    Compact,
    /// Multi-line, for reading by hand.
    Pretty,
    /// JSON lines without ANSI colors.
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the calmerge crates when no directive or `RUST_LOG` is given.
    pub level: Level,
    pub format: TracingOutputFormat,
    /// Show file and line of each event.
    pub source_location: bool,
    /// Log span close events with their busy time (parse and refresh timings).
    pub span_timings: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: TracingOutputFormat::default(),
            source_location: false,
            span_timings: false,
            directive: None,
        }
    }
}

impl TracingConfig {
    /// Debug level with source locations and span timings.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            source_location: true,
            span_timings: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// Builds the filter: explicit directive, else `RUST_LOG`, else
    /// `calmerge=<level>` (which covers every `calmerge_*` target).
    pub fn filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(directive) = &self.directive {
            return Ok(EnvFilter::try_new(directive)?);
        }
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => {
                let fallback = format!("calmerge={}", self.level.to_string().to_ascii_lowercase());
                Ok(EnvFilter::try_new(fallback)?)
            }
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails on an invalid directive or when a subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let spans = if config.span_timings {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(spans);
    let output = match config.format {
        TracingOutputFormat::Compact => base.compact().boxed(),
        TracingOutputFormat::Pretty => base.pretty().boxed(),
        TracingOutputFormat::Json => base.with_ansi(false).json().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(output).try_init()?;
    Ok(())
}
