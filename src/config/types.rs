use crate::error::{ConfigurationError, Result};
use crate::process::ComponentKind;
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

/// Top-level process description from a process TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProcessFile {
	/// Process name, e.g. `GeometryTest`.
	pub process: String,

	/// Extra unit directories, relative to the process file.
	#[serde(default)]
	pub unit_paths: Vec<PathBuf>,

	/// Units to load, in merge order.
	#[serde(default)]
	pub load: Vec<String>,

	/// The event source.
	pub source: Option<SourceDecl>,

	/// Event count limit.
	pub max_events: Option<MaxEventsDecl>,

	/// Services keyed by service type, each a flat option map.
	#[serde(default)]
	pub services: OrderedTable<toml::Table>,

	/// Explicitly declared modules keyed by label.
	#[serde(default)]
	pub modules: OrderedTable<ComponentDecl>,

	/// Execution paths keyed by name, each a list of step labels.
	#[serde(default)]
	pub paths: OrderedTable<Vec<String>>,

	/// Dotted-path overrides applied after everything else.
	#[serde(default)]
	pub overrides: toml::Table,
}

/// The `[source]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDecl {
	#[serde(rename = "type")]
	pub plugin: String,

	#[serde(default)]
	pub params: toml::Table,
}

/// The `[max-events]` table.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaxEventsDecl {
	pub input: i64,
}

/// A component as written in a process file or a unit file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDecl {
	pub kind: ComponentKind,

	/// Framework type name of the component.
	#[serde(rename = "type")]
	pub plugin: String,

	#[serde(default)]
	pub params: toml::Table,

	/// Whether overrides may add parameters this component does not declare.
	#[serde(default)]
	pub extensible: bool,
}

/// A unit file maps component labels to their declarations.
pub type UnitFile = OrderedTable<ComponentDecl>;

/// A table keyed by name, kept in the order the file declares it.
#[derive(Debug, Clone)]
pub struct OrderedTable<T> {
	entries: Vec<(String, T)>,
}

impl<T> Default for OrderedTable<T> {
	fn default() -> Self {
		OrderedTable {
			entries: Vec::new(),
		}
	}
}

impl<T> OrderedTable<T> {
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, key: &str) -> Option<&T> {
		self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.get(key).is_some()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(k, _)| k.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}
}

impl<'a, T> IntoIterator for &'a OrderedTable<T> {
	type Item = &'a (String, T);
	type IntoIter = std::slice::Iter<'a, (String, T)>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.iter()
	}
}

struct OrderedTableVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedTableVisitor<T> {
	type Value = OrderedTable<T>;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a table")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
		let mut entries = Vec::new();
		while let Some((key, value)) = map.next_entry::<String, T>()? {
			entries.push((key, value));
		}
		Ok(OrderedTable { entries })
	}
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedTable<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		deserializer.deserialize_map(OrderedTableVisitor(PhantomData))
	}
}

impl ProcessFile {
	/// Validate fields serde cannot check on its own.
	pub fn validate(&self) -> Result<()> {
		if self.process.is_empty() || !self.process.chars().all(|c| c.is_ascii_alphanumeric()) {
			return Err(ConfigurationError::InvalidValue {
				path: "process".to_string(),
				reason: format!(
					"process name {:?} must be non-empty and alphanumeric",
					self.process
				),
			});
		}
		for key in self.overrides.keys() {
			if !key.contains('.') {
				return Err(ConfigurationError::InvalidValue {
					path: format!("overrides.{}", key),
					reason: "override keys are dotted paths like \"label.parameter\"".to_string(),
				});
			}
		}
		Ok(())
	}
}
