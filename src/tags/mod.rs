//! Embedded comment reading and parsing
//!
//! Mixed In Key writes its analysis into the comment tag of each file
//! (e.g. `"5A - Energy 6"`). Reading the tag is behind the [`TagReader`]
//! trait so reconcilers can run against a stub; parsing is pure.

mod lofty_reader;
mod parse;
mod traits;

pub use lofty_reader::LoftyTagReader;
pub use parse::{parse_energy, parse_initial_key};
pub use traits::{TagReadError, TagReader};
