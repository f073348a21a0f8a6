//! Configuration values and process description files.
//!
//! This module handles:
//! - Typed parameter values and nested parameter sets
//! - TOML parsing of process files and unit files
//! - Unit search path discovery
//! - The `pset init` template

pub mod cascade;
pub mod parser;
pub mod pset;
pub mod template;
pub mod types;
pub mod value;

pub use cascade::{find_unit_file, list_unit_files, unit_search_path, user_units_dir};
pub use parser::{parse_process_file, parse_process_str, parse_unit_file, parse_unit_str};
pub use pset::ParameterSet;
pub use types::{ComponentDecl, MaxEventsDecl, OrderedTable, ProcessFile, SourceDecl};
pub use value::{Value, ValueKind};
