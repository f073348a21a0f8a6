use crate::config::pset::{ParameterSet, join_path};
use crate::config::types::{ComponentDecl, ProcessFile, UnitFile};
use crate::config::value::Value;
use crate::error::{ConfigurationError, Result};
use crate::process::{Component, LabelledComponent};
use std::path::Path;

/// Parse a process file from the given path.
pub fn parse_process_file(path: &Path) -> Result<ProcessFile> {
	if !path.exists() {
		return Err(ConfigurationError::ProcessFileNotFound {
			path: path.to_path_buf(),
		});
	}
	let content = read_file(path)?;
	parse_process_str(&content, path)
}

/// Parse a process description from a string (useful for testing).
pub fn parse_process_str(content: &str, path: &Path) -> Result<ProcessFile> {
	let file: ProcessFile =
		toml::from_str(content).map_err(|source| ConfigurationError::ConfigParseError {
			path: path.to_path_buf(),
			source,
		})?;

	file.validate()?;

	Ok(file)
}

/// Parse a unit file into its labelled components.
pub fn parse_unit_file(path: &Path) -> Result<Vec<LabelledComponent>> {
	let content = read_file(path)?;
	parse_unit_str(&content, path)
}

/// Parse a unit from a string (useful for testing).
pub fn parse_unit_str(content: &str, path: &Path) -> Result<Vec<LabelledComponent>> {
	let unit: UnitFile =
		toml::from_str(content).map_err(|source| ConfigurationError::ConfigParseError {
			path: path.to_path_buf(),
			source,
		})?;

	unit.iter()
		.map(|(label, decl)| -> Result<LabelledComponent> {
			Ok(LabelledComponent {
				label: label.to_string(),
				component: component_from_decl(decl, label)?,
			})
		})
		.collect()
}

fn read_file(path: &Path) -> Result<String> {
	std::fs::read_to_string(path).map_err(|source| ConfigurationError::ConfigReadError {
		path: path.to_path_buf(),
		source,
	})
}

/// Turn a parsed declaration into a component. `label` scopes error paths.
pub fn component_from_decl(decl: &ComponentDecl, label: &str) -> Result<Component> {
	Ok(Component {
		kind: decl.kind,
		plugin: decl.plugin.clone(),
		params: pset_from_table(&decl.params, label)?,
		extensible: decl.extensible,
	})
}

/// Convert a TOML table into a parameter set.
pub fn pset_from_table(table: &toml::Table, scope: &str) -> Result<ParameterSet> {
	let mut pset = ParameterSet::new();
	for (name, value) in table {
		let path = join_path(scope, name);
		pset.declare(name.clone(), value_from_toml(value, &path)?)?;
	}
	Ok(pset)
}

/// Convert a single TOML value into a parameter value.
///
/// Arrays must hold only strings; datetimes have no parameter equivalent.
pub fn value_from_toml(value: &toml::Value, path: &str) -> Result<Value> {
	match value {
		toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
		toml::Value::Integer(i) => Ok(Value::Int(*i)),
		toml::Value::Float(d) => Ok(Value::Double(*d)),
		toml::Value::String(s) => Ok(Value::String(s.clone())),
		toml::Value::Array(items) => items
			.iter()
			.map(|item| {
				item.as_str()
					.map(str::to_string)
					.ok_or_else(|| ConfigurationError::UnsupportedValue {
						path: path.to_string(),
						reason: format!("arrays may only hold strings, found {}", item.type_str()),
					})
			})
			.collect::<Result<Vec<_>>>()
			.map(Value::VString),
		toml::Value::Table(table) => pset_from_table(table, path).map(Value::PSet),
		toml::Value::Datetime(_) => Err(ConfigurationError::UnsupportedValue {
			path: path.to_string(),
			reason: "datetimes are not parameter values".to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::process::ComponentKind;
	use std::path::PathBuf;

	#[test]
	fn test_parse_minimal_process() {
		let content = r#"
process = "GeometryTest"
"#;
		let path = PathBuf::from("process.toml");
		let file = parse_process_str(content, &path).unwrap();

		assert_eq!(file.process, "GeometryTest");
		assert!(file.load.is_empty());
		assert!(file.source.is_none());
		assert!(file.max_events.is_none());
		assert!(file.services.is_empty());
		assert!(file.paths.is_empty());
	}

	#[test]
	fn test_parse_full_process() {
		let content = r#"
process = "GeometryTest"
unit-paths = ["units"]
load = ["Geometry.CSCGeometry.cscGeometry_cfi"]

[source]
type = "EmptySource"

[max-events]
input = 1

[services.EnableFloatingPointExceptions]
enableOverFlowEx = true

[modules.producer]
kind = "analyzer"
type = "CSCGeometryAnalyzer"

[paths]
p1 = ["producer"]

[overrides]
"CSCGeometryESModule.debugV" = true
"#;
		let path = PathBuf::from("process.toml");
		let file = parse_process_str(content, &path).unwrap();

		assert_eq!(file.unit_paths, vec![PathBuf::from("units")]);
		assert_eq!(file.load, vec!["Geometry.CSCGeometry.cscGeometry_cfi"]);
		assert_eq!(file.source.as_ref().unwrap().plugin, "EmptySource");
		assert_eq!(file.max_events.unwrap().input, 1);
		assert!(file.services.contains_key("EnableFloatingPointExceptions"));
		let producer = file.modules.get("producer").unwrap();
		assert_eq!(producer.kind, ComponentKind::Analyzer);
		assert_eq!(producer.plugin, "CSCGeometryAnalyzer");
		assert_eq!(file.paths.get("p1").unwrap(), &vec!["producer".to_string()]);
		assert_eq!(
			file.overrides.get("CSCGeometryESModule.debugV"),
			Some(&toml::Value::Boolean(true))
		);
	}

	#[test]
	fn test_tables_keep_file_order() {
		let content = r#"
process = "Ordered"

[modules.zeta]
kind = "producer"
type = "StripProducer"

[modules.alpha]
kind = "analyzer"
type = "StripAnalyzer"

[paths]
reco = ["zeta"]
ana = ["alpha"]
"#;
		let file = parse_process_str(content, Path::new("process.toml")).unwrap();
		assert_eq!(file.modules.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
		assert_eq!(file.paths.keys().collect::<Vec<_>>(), vec!["reco", "ana"]);

		let unit = parse_unit_str(
			r#"
[Zeta]
kind = "es-producer"
type = "Zeta"

[Alpha]
kind = "es-producer"
type = "Alpha"
"#,
			Path::new("unit.toml"),
		)
		.unwrap();
		let labels: Vec<&str> = unit.iter().map(|c| c.label.as_str()).collect();
		assert_eq!(labels, vec!["Zeta", "Alpha"]);
	}

	#[test]
	fn test_unknown_top_level_key_is_rejected() {
		let content = r#"
process = "GeometryTest"
scheduler = "threads"
"#;
		let result = parse_process_str(content, Path::new("process.toml"));
		assert!(matches!(
			result,
			Err(ConfigurationError::ConfigParseError { .. })
		));
	}

	#[test]
	fn test_process_name_must_be_alphanumeric() {
		let result = parse_process_str(r#"process = "Geometry Test""#, Path::new("p.toml"));
		match result.unwrap_err() {
			ConfigurationError::InvalidValue { path, .. } => assert_eq!(path, "process"),
			other => panic!("Expected InvalidValue, got {other:?}"),
		}
	}

	#[test]
	fn test_override_keys_must_be_dotted() {
		let content = r#"
process = "GeometryTest"

[overrides]
debugV = true
"#;
		let result = parse_process_str(content, Path::new("p.toml"));
		assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
	}

	#[test]
	fn test_missing_process_file() {
		let result = parse_process_file(Path::new("/nonexistent/process.toml"));
		assert!(matches!(
			result,
			Err(ConfigurationError::ProcessFileNotFound { .. })
		));
	}

	#[test]
	fn test_parse_unit_with_nested_sets() {
		let content = r#"
[MessageLoggerDefaults]
kind = "es-producer"
type = "Dummy"
extensible = true

[MessageLoggerDefaults.params]
categories = ["CSC", "CSCNumbering"]
scale = 1.5

[MessageLoggerDefaults.params.debug]
threshold = "DEBUG"
"#;
		let components = parse_unit_str(content, Path::new("unit.toml")).unwrap();
		assert_eq!(components.len(), 1);
		let labelled = &components[0];
		assert_eq!(labelled.label, "MessageLoggerDefaults");
		assert!(labelled.component.extensible);
		let params = &labelled.component.params;
		assert_eq!(
			params.get("categories"),
			Some(&Value::VString(vec![
				"CSC".to_string(),
				"CSCNumbering".to_string()
			]))
		);
		assert_eq!(params.get("scale"), Some(&Value::Double(1.5)));
		assert_eq!(params.get_path("debug.threshold"), Some(&Value::from("DEBUG")));
	}

	#[test]
	fn test_mixed_arrays_are_unsupported() {
		let value: toml::Value = toml::from_str::<toml::Table>("v = [1, 2]").unwrap()["v"].clone();
		match value_from_toml(&value, "producer.v").unwrap_err() {
			ConfigurationError::UnsupportedValue { path, .. } => assert_eq!(path, "producer.v"),
			other => panic!("Expected UnsupportedValue, got {other:?}"),
		}
	}

	#[test]
	fn test_empty_array_is_empty_vstring() {
		let value = toml::Value::Array(Vec::new());
		assert_eq!(
			value_from_toml(&value, "debugModules").unwrap(),
			Value::VString(Vec::new())
		);
	}
}
