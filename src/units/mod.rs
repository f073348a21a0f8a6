//! Defaults-producing units and the catalog that resolves them.
//!
//! A unit is loaded by name and produces labelled components with their
//! default parameters. Names resolve against unit files on the search path
//! first, then against the built-in units.

pub mod builtin;

use crate::config::cascade::{find_unit_file, list_unit_files};
use crate::config::parse_unit_file;
use crate::error::{ConfigurationError, Result};
use crate::process::LabelledComponent;
use builtin::{BUILTIN_UNITS, BuiltinUnit};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// A named unit producing default parameter sets.
pub trait DefaultsUnit {
	fn name(&self) -> &str;

	fn origin(&self) -> UnitOrigin;

	/// Produce the unit's components. Called once per load.
	fn produce(&self) -> Result<Vec<LabelledComponent>>;
}

/// A unit backed by a TOML file.
#[derive(Debug, Clone)]
pub struct FileUnit {
	pub name: String,
	pub path: PathBuf,
}

impl DefaultsUnit for FileUnit {
	fn name(&self) -> &str {
		&self.name
	}

	fn origin(&self) -> UnitOrigin {
		UnitOrigin::File(self.path.clone())
	}

	fn produce(&self) -> Result<Vec<LabelledComponent>> {
		parse_unit_file(&self.path)
	}
}

/// Where a loaded unit was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
	Builtin,
	File(PathBuf),
}

impl fmt::Display for UnitOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UnitOrigin::Builtin => f.write_str("builtin"),
			UnitOrigin::File(path) => write!(f, "{}", path.display()),
		}
	}
}

/// A resolved unit with the components it produced.
#[derive(Debug, Clone)]
pub struct LoadedUnit {
	/// The canonical name, whichever alias the unit was requested by.
	pub name: String,
	pub origin: UnitOrigin,
	pub components: Vec<LabelledComponent>,
}

/// Resolves unit names against a search path and the built-in units.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
	search_path: Vec<PathBuf>,
}

impl Catalog {
	/// A catalog with only the built-in units.
	pub fn builtin() -> Self {
		Self::default()
	}

	/// A catalog that also searches the given directories, in order.
	pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
		Catalog { search_path }
	}

	pub fn search_path(&self) -> &[PathBuf] {
		&self.search_path
	}

	pub fn builtins(&self) -> &'static [BuiltinUnit] {
		BUILTIN_UNITS
	}

	/// Unit files visible on the search path, with the directory they live in.
	pub fn file_units(&self) -> Vec<(String, PathBuf)> {
		self.search_path
			.iter()
			.flat_map(|dir| {
				list_unit_files(dir)
					.into_iter()
					.map(move |name| (name, dir.clone()))
			})
			.collect()
	}

	/// Resolve a unit by name without producing it.
	pub fn resolve(&self, name: &str) -> Result<Box<dyn DefaultsUnit>> {
		if let Some(path) = find_unit_file(&self.search_path, name)? {
			debug!(unit = name, path = %path.display(), "resolved unit file");
			return Ok(Box::new(FileUnit {
				name: name.to_string(),
				path,
			}));
		}

		if let Some(unit) = BUILTIN_UNITS.iter().find(|u| u.matches(name)) {
			debug!(unit = name, builtin = unit.name, "resolved builtin unit");
			return Ok(Box::new(*unit));
		}

		Err(ConfigurationError::UnitNotFound {
			name: name.to_string(),
			searched: self.search_path.len(),
		})
	}

	/// Resolve a unit and produce its components.
	pub fn load(&self, name: &str) -> Result<LoadedUnit> {
		let unit = self.resolve(name)?;
		Ok(LoadedUnit {
			name: unit.name().to_string(),
			origin: unit.origin(),
			components: unit.produce()?,
		})
	}
}
