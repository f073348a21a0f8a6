//! The process tree and how it is assembled.
//!
//! This module handles:
//! - Components with their kinds, parameters and provenance
//! - Accumulating loads, declarations and overrides in [`ProcessBuilder`]
//! - Assembling a [`Process`] from a process file

pub mod builder;
pub mod component;
pub mod path;

pub use builder::ProcessBuilder;
pub use component::{
	Component, ComponentEntry, ComponentKind, ComponentTable, LabelledComponent, Origin,
};
pub use path::ExecutionPath;

use crate::config::cascade::unit_search_path;
use crate::config::parser::{component_from_decl, pset_from_table, value_from_toml};
use crate::config::{ParameterSet, ProcessFile, Value, parse_process_file};
use crate::error::Result;
use crate::exec::source::{EmptySourceConfig, MaxEvents};
use crate::services::{FpeConfig, MessageLoggerConfig};
use crate::units::{Catalog, UnitOrigin};
use std::fmt;
use std::path::{Path, PathBuf};

/// A fully assembled and validated process configuration.
#[derive(Debug, Clone)]
pub struct Process {
	pub(crate) name: String,
	pub(crate) modules: ComponentTable,
	pub(crate) services: ComponentTable,
	pub(crate) source: Component,
	pub(crate) source_config: EmptySourceConfig,
	pub(crate) max_events: MaxEvents,
	pub(crate) max_events_pset: ParameterSet,
	pub(crate) paths: Vec<ExecutionPath>,
	pub(crate) units: Vec<(String, UnitOrigin)>,
	pub(crate) message_logger: Option<MessageLoggerConfig>,
	pub(crate) fpe: Option<FpeConfig>,
}

impl Process {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// A module (ES or event) by label.
	pub fn component(&self, label: &str) -> Option<&ComponentEntry> {
		self.modules.get(label)
	}

	/// A service by type name.
	pub fn service(&self, name: &str) -> Option<&ComponentEntry> {
		self.services.get(name)
	}

	pub fn components(&self) -> &ComponentTable {
		&self.modules
	}

	pub fn services(&self) -> &ComponentTable {
		&self.services
	}

	pub fn source(&self) -> &Component {
		&self.source
	}

	pub fn source_config(&self) -> &EmptySourceConfig {
		&self.source_config
	}

	pub fn max_events(&self) -> MaxEvents {
		self.max_events
	}

	pub fn paths(&self) -> &[ExecutionPath] {
		&self.paths
	}

	pub fn path(&self, name: &str) -> Option<&ExecutionPath> {
		self.paths.iter().find(|p| p.name == name)
	}

	/// Units in load order, with where each was found.
	pub fn units(&self) -> &[(String, UnitOrigin)] {
		&self.units
	}

	pub fn message_logger(&self) -> Option<&MessageLoggerConfig> {
		self.message_logger.as_ref()
	}

	pub fn fpe(&self) -> Option<&FpeConfig> {
		self.fpe.as_ref()
	}

	/// Look up a value by dotted path: `label.param[.nested...]`,
	/// `source.param` or `maxEvents.input`.
	pub fn get(&self, path: &str) -> Option<&Value> {
		let (root, rest) = path.split_once('.')?;
		match root {
			"maxEvents" => self.max_events_pset.get_path(rest),
			"source" => self.source.params.get_path(rest),
			label => self
				.modules
				.get(label)
				.or_else(|| self.services.get(label))
				.and_then(|entry| entry.component.params.get_path(rest)),
		}
	}

	/// Every leaf value in the tree with its dotted path.
	pub fn leaf_paths(&self) -> Vec<(String, &Value)> {
		let mut leaves = self.max_events_pset.leaf_paths("maxEvents");
		leaves.extend(self.source.params.leaf_paths("source"));
		for entry in self.services.iter().chain(self.modules.iter()) {
			leaves.extend(entry.component.params.leaf_paths(&entry.label));
		}
		leaves
	}
}

fn write_entry(f: &mut fmt::Formatter<'_>, entry: &ComponentEntry) -> fmt::Result {
	let origins: Vec<String> = entry.origins.iter().map(ToString::to_string).collect();
	writeln!(
		f,
		"{} = {}(\"{}\",    # {}",
		entry.label,
		entry.component.kind,
		entry.component.plugin,
		origins.join(", ")
	)?;
	entry.component.params.write_indented(f, 1)?;
	writeln!(f, ")")
}

impl fmt::Display for Process {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "process {}", self.name)?;
		writeln!(f)?;
		writeln!(f, "source = {}(\"{}\",", self.source.kind, self.source.plugin)?;
		self.source.params.write_indented(f, 1)?;
		writeln!(f, ")")?;
		writeln!(f, "maxEvents = PSet(")?;
		self.max_events_pset.write_indented(f, 1)?;
		writeln!(f, ")")?;

		for entry in self.services.iter().chain(self.modules.iter()) {
			writeln!(f)?;
			write_entry(f, entry)?;
		}

		if !self.paths.is_empty() {
			writeln!(f)?;
		}
		for path in &self.paths {
			writeln!(f, "{} = Path({})", path.name, path.steps.join("+"))?;
		}
		Ok(())
	}
}

/// Assemble a process from a parsed process file.
///
/// Units load first, in order, then services, the source, the event
/// limit, explicit modules and paths. Overrides apply last.
pub fn assemble(file: &ProcessFile, catalog: &Catalog) -> Result<Process> {
	let mut builder = ProcessBuilder::new(&file.process, catalog);

	for unit in &file.load {
		builder.load(unit)?;
	}

	for (name, options) in &file.services {
		let params = pset_from_table(options, name)?;
		builder.add_service(Component::new(ComponentKind::Service, name).with_params(params))?;
	}

	if let Some(source) = &file.source {
		let params = pset_from_table(&source.params, "source")?;
		builder.set_source(Component::new(ComponentKind::Source, &source.plugin).with_params(params))?;
	}

	if let Some(max_events) = file.max_events {
		builder.set_max_events(max_events.input)?;
	}

	for (label, decl) in &file.modules {
		builder.add_module(label, component_from_decl(decl, label)?)?;
	}

	for (name, steps) in &file.paths {
		builder.declare_path(name, steps.clone())?;
	}

	for (path, value) in &file.overrides {
		builder.override_param(path, value_from_toml(value, path)?);
	}

	builder.build()
}

/// Parse a process file and assemble it.
///
/// Units resolve against `cli_unit_dirs`, the file's `unit-paths`
/// (relative to the file), `PSET_UNIT_PATH` and the user unit directory.
pub fn load_process(path: &Path, cli_unit_dirs: &[PathBuf]) -> Result<Process> {
	let file = parse_process_file(path)?;
	let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
	let catalog = Catalog::with_search_path(unit_search_path(cli_unit_dirs, &file.unit_paths, base_dir));
	assemble(&file, &catalog)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::template::generate_init_template;
	use crate::config::parse_process_str;
	use crate::error::ConfigurationError;
	use crate::services::Severity;
	use std::fs;

	fn template_process() -> Process {
		let file = parse_process_str(generate_init_template(), Path::new("process.toml")).unwrap();
		assemble(&file, &Catalog::builtin()).unwrap()
	}

	#[test]
	fn test_template_assembles() {
		let process = template_process();
		assert_eq!(process.name(), "GeometryTest");
		assert_eq!(process.source().plugin, "EmptySource");
		assert_eq!(process.max_events().permitted(), Some(1));
		assert_eq!(process.path("p1").unwrap().steps, vec!["producer"]);
		assert_eq!(
			process.component("producer").unwrap().component.kind,
			ComponentKind::Analyzer
		);
		assert_eq!(
			process.get("CSCGeometryESModule.debugV"),
			Some(&Value::from(true))
		);
		assert_eq!(process.get("maxEvents.input"), Some(&Value::from(1)));
	}

	#[test]
	fn test_template_destination_thresholds_are_independent() {
		let process = template_process();
		let logger = process.message_logger().unwrap();
		assert_eq!(logger.destination("errors").unwrap().threshold, Severity::Error);
		assert_eq!(logger.destination("debug").unwrap().threshold, Severity::Debug);
		assert_eq!(
			process.get("MessageLogger.errors.threshold"),
			Some(&Value::from("ERROR"))
		);
		assert_eq!(
			process.get("MessageLogger.debug.threshold"),
			Some(&Value::from("DEBUG"))
		);
	}

	#[test]
	fn test_template_fpe_service() {
		let process = template_process();
		let fpe = process.fpe().unwrap();
		assert!(fpe.overflow && fpe.div_by_zero && fpe.invalid);
		assert!(!fpe.underflow);
	}

	#[test]
	fn test_get_unknown_paths() {
		let process = template_process();
		assert_eq!(process.get("CSCGeometryESModule"), None);
		assert_eq!(process.get("CSCGeometryESModule.verbosity"), None);
		assert_eq!(process.get("DTGeometryESModule.debugV"), None);
	}

	#[test]
	fn test_leaf_paths_cover_tree() {
		let process = template_process();
		let paths: Vec<String> = process.leaf_paths().into_iter().map(|(p, _)| p).collect();
		assert!(paths.contains(&"maxEvents.input".to_string()));
		assert!(paths.contains(&"CSCGeometryESModule.debugV".to_string()));
		assert!(paths.contains(&"MessageLogger.debug.INFO.limit".to_string()));
		assert!(paths.contains(&"EnableFloatingPointExceptions.enableInvalidEx".to_string()));
	}

	#[test]
	fn test_dump_shows_provenance() {
		let dump = template_process().to_string();
		assert!(dump.starts_with("process GeometryTest\n"));
		assert!(dump.contains(
			"CSCGeometryESModule = ESProducer(\"CSCGeometryESModule\",    # unit Geometry.CSCGeometry.cscGeometry_cfi"
		));
		assert!(dump.contains("    debugV = bool(true),"));
		assert!(dump.contains("p1 = Path(producer)"));
	}

	#[test]
	fn test_load_process_with_local_unit() {
		let dir = tempfile::tempdir().unwrap();
		let units = dir.path().join("units");
		fs::create_dir_all(&units).unwrap();
		fs::write(
			units.join("localAnalyzer_cfi.toml"),
			r#"
[dumper]
kind = "analyzer"
type = "CSCGeometryDumper"
params = { verbose = false }
"#,
		)
		.unwrap();
		let process_file = dir.path().join("process.toml");
		fs::write(
			&process_file,
			r#"
process = "LocalTest"
unit-paths = ["units"]
load = ["localAnalyzer_cfi"]

[source]
type = "EmptySource"

[paths]
p1 = ["dumper"]

[overrides]
"dumper.verbose" = true
"#,
		)
		.unwrap();

		let process = load_process(&process_file, &[]).unwrap();
		assert_eq!(process.get("dumper.verbose"), Some(&Value::from(true)));
		assert_eq!(
			process.units()[0].1,
			UnitOrigin::File(units.join("localAnalyzer_cfi.toml"))
		);
		assert_eq!(process.max_events().permitted(), None);
	}

	#[test]
	fn test_es_module_on_path_is_not_schedulable() {
		let file = parse_process_str(
			r#"
process = "GeometryTest"
load = ["cscGeometry"]

[source]
type = "EmptySource"

[paths]
p1 = ["CSCGeometryESModule"]
"#,
			Path::new("process.toml"),
		)
		.unwrap();
		assert!(matches!(
			assemble(&file, &Catalog::builtin()),
			Err(ConfigurationError::NotSchedulable { .. })
		));
	}

	#[test]
	fn test_missing_process_file() {
		let dir = tempfile::tempdir().unwrap();
		assert!(matches!(
			load_process(&dir.path().join("absent.toml"), &[]),
			Err(ConfigurationError::ProcessFileNotFound { .. })
		));
	}
}
