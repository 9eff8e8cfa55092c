//! iCalendar text parsing.
//!
//! - [`lexer`]: line unfolding and property splitting
//! - [`parser`]: BEGIN/END tree building
//! - [`values`]: typed DATE, DATE-TIME, UTC-OFFSET and DURATION values

pub mod component;
pub mod lexer;
pub mod parser;
pub mod values;

pub use component::{Component, ComponentKind, Property};
pub use lexer::{parse_property, unescape_text, unfold_lines};
pub use parser::{ParseWarning, ParsedCalendar, parse_components, parse_ics};
pub use values::{IcsDateTime, parse_date_time_list, parse_duration, parse_utc_offset};
