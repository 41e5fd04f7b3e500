//! Engine options for nearconf.
//!
//! This module handles:
//! - Construction-time options and per-call queries
//! - Merging and normalizing them into the options a single search runs with
//! - Reading construction defaults from a TOML options file

pub mod normalize;
pub mod parser;
pub mod types;

pub use normalize::{normalize_path, resolve_options};
pub use parser::{parse_options_file, parse_options_str};
pub use types::{Options, OptionsFile, Query, ResolvedOptions, TextParser};
