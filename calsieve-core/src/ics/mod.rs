//! ICS reading and writing.

mod parse;
mod write;

pub use parse::{parse, parse_str};
pub use write::{serialize, to_ics_string};
