use crate::error::{ConfigurationError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding extra unit directories (platform path list).
pub const UNIT_PATH_ENV_VAR: &str = "PSET_UNIT_PATH";

/// Environment variable that, if truthy, skips `~/.pset/units`.
pub const NO_USER_UNITS_ENV_VAR: &str = "PSET_NO_USER_UNITS";

/// Extension of unit files on disk.
pub const UNIT_FILE_EXTENSION: &str = "toml";

/// Build the unit search path.
///
/// The order is:
/// 1. Directories given on the command line
/// 2. `unit-paths` declared by the process file, relative to `base_dir`
/// 3. Entries of `$PSET_UNIT_PATH`
/// 4. `~/.pset/units` (unless `$PSET_NO_USER_UNITS` is truthy)
///
/// Directories that do not exist are dropped; duplicates keep their first
/// position.
pub fn unit_search_path(cli_dirs: &[PathBuf], declared: &[PathBuf], base_dir: &Path) -> Vec<PathBuf> {
	let mut candidates: Vec<PathBuf> = cli_dirs.to_vec();
	candidates.extend(declared.iter().map(|dir| base_dir.join(dir)));

	if let Some(path_var) = std::env::var_os(UNIT_PATH_ENV_VAR) {
		candidates.extend(std::env::split_paths(&path_var));
	}

	if !is_env_truthy(NO_USER_UNITS_ENV_VAR) {
		match user_units_dir() {
			Ok(dir) => candidates.push(dir),
			Err(e) => debug!(error = %e, "skipping user unit directory"),
		}
	}

	let mut dirs: Vec<PathBuf> = Vec::new();
	for dir in candidates {
		if !dir.is_dir() {
			debug!(dir = %dir.display(), "unit directory does not exist, skipping");
			continue;
		}
		if !dirs.contains(&dir) {
			dirs.push(dir);
		}
	}
	dirs
}

/// Get the path to the user's unit directory.
pub fn user_units_dir() -> Result<PathBuf> {
	let home_dir = dirs::home_dir().ok_or(ConfigurationError::HomeDirectoryNotFound)?;
	Ok(home_dir.join(".pset").join("units"))
}

/// Map a dotted unit name to its relative file path:
/// `Geometry.CSCGeometry.cscGeometry_cfi` becomes
/// `Geometry/CSCGeometry/cscGeometry_cfi.toml`.
pub fn unit_relative_path(name: &str) -> Result<PathBuf> {
	let segments: Vec<&str> = name.split('.').collect();
	let valid = segments.iter().all(|s| {
		!s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
	});
	if !valid {
		return Err(ConfigurationError::InvalidName {
			name: name.to_string(),
			reason: "unit names are dot-separated identifiers",
		});
	}

	let mut path: PathBuf = segments.iter().collect();
	path.set_extension(UNIT_FILE_EXTENSION);
	Ok(path)
}

/// Find the first unit file for `name` along the search path.
pub fn find_unit_file(search_path: &[PathBuf], name: &str) -> Result<Option<PathBuf>> {
	let relative = unit_relative_path(name)?;
	Ok(search_path
		.iter()
		.map(|dir| dir.join(&relative))
		.find(|candidate| candidate.is_file()))
}

/// List the dotted names of every unit file under `dir`, sorted.
pub fn list_unit_files(dir: &Path) -> Vec<String> {
	let mut names = Vec::new();
	collect_unit_files(dir, &mut Vec::new(), &mut names);
	names.sort();
	names
}

fn collect_unit_files(dir: &Path, prefix: &mut Vec<String>, names: &mut Vec<String>) {
	let Ok(entries) = std::fs::read_dir(dir) else {
		return;
	};
	for entry in entries.flatten() {
		let path = entry.path();
		let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
			continue;
		};
		if path.is_dir() {
			prefix.push(stem);
			collect_unit_files(&path, prefix, names);
			prefix.pop();
		} else if path.extension().is_some_and(|ext| ext == UNIT_FILE_EXTENSION) {
			let mut segments = prefix.clone();
			segments.push(stem);
			names.push(segments.join("."));
		}
	}
}

/// Check if an environment variable is set to a truthy value.
pub fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}
