//! calmerge command-line interface
//!
//! Builds the calendar service from `CALENDAR_<NAME>` variables and the
//! flags, runs one subcommand, and prints JSON.

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
