//! Subcommand implementations.
//!
//! Every command writes one pretty-printed JSON document to the given
//! writer.

pub mod events;
pub mod sources;

use std::io::Write;

use serde::Serialize;

use crate::error::ClientResult;

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> ClientResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
