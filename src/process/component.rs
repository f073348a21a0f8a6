use crate::config::ParameterSet;
use crate::error::{ConfigurationError, Result};
use serde::Deserialize;
use std::fmt;

/// What kind of framework entity a component configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
	EsProducer,
	EsSource,
	Analyzer,
	Producer,
	Filter,
	Service,
	Source,
}

impl ComponentKind {
	/// Framework spelling of the kind.
	pub fn as_str(&self) -> &'static str {
		match self {
			ComponentKind::EsProducer => "ESProducer",
			ComponentKind::EsSource => "ESSource",
			ComponentKind::Analyzer => "EDAnalyzer",
			ComponentKind::Producer => "EDProducer",
			ComponentKind::Filter => "EDFilter",
			ComponentKind::Service => "Service",
			ComponentKind::Source => "Source",
		}
	}

	/// Whether components of this kind may appear as path steps.
	pub fn is_schedulable(&self) -> bool {
		matches!(
			self,
			ComponentKind::Analyzer | ComponentKind::Producer | ComponentKind::Filter
		)
	}
}

impl fmt::Display for ComponentKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A configured framework entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
	pub kind: ComponentKind,

	/// Framework type name, e.g. `CSCGeometryESModule`.
	pub plugin: String,

	pub params: ParameterSet,

	/// Whether overrides may add parameters not already declared.
	pub extensible: bool,
}

impl Component {
	pub fn new(kind: ComponentKind, plugin: impl Into<String>) -> Self {
		Component {
			kind,
			plugin: plugin.into(),
			params: ParameterSet::new(),
			extensible: false,
		}
	}

	pub fn with_params(mut self, params: ParameterSet) -> Self {
		self.params = params;
		self
	}

	pub fn extensible(mut self) -> Self {
		self.extensible = true;
		self
	}

	/// `ESProducer("CSCGeometryESModule")`, as used in dumps and errors.
	pub fn describe(&self) -> String {
		format!("{}(\"{}\")", self.kind, self.plugin)
	}
}

/// A component together with the label it is registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledComponent {
	pub label: String,
	pub component: Component,
}

/// Where a component came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
	/// Created or merged by loading the named unit.
	Unit(String),
	/// Declared directly by the process description.
	Explicit,
}

impl fmt::Display for Origin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Origin::Unit(name) => write!(f, "unit {}", name),
			Origin::Explicit => f.write_str("explicit"),
		}
	}
}

/// A component in the process tree with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEntry {
	pub label: String,
	pub component: Component,

	/// Every contributor in order; the first one created the component.
	pub origins: Vec<Origin>,
}

/// Components keyed by label, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentTable {
	entries: Vec<ComponentEntry>,
}

impl ComponentTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains(&self, label: &str) -> bool {
		self.get(label).is_some()
	}

	pub fn get(&self, label: &str) -> Option<&ComponentEntry> {
		self.entries.iter().find(|e| e.label == label)
	}

	pub fn get_mut(&mut self, label: &str) -> Option<&mut ComponentEntry> {
		self.entries.iter_mut().find(|e| e.label == label)
	}

	pub fn iter(&self) -> impl Iterator<Item = &ComponentEntry> {
		self.entries.iter()
	}

	/// Register a new label. Labels are declared once.
	pub fn insert(&mut self, label: &str, component: Component, origin: Origin) -> Result<()> {
		if self.contains(label) {
			return Err(ConfigurationError::DuplicateLabel {
				label: label.to_string(),
			});
		}
		self.entries.push(ComponentEntry {
			label: label.to_string(),
			component,
			origins: vec![origin],
		});
		Ok(())
	}

	/// Merge a component into the table.
	///
	/// A new label is created. An existing label must keep its kind and
	/// plugin; its parameters are merged with the incoming ones winning.
	pub fn merge(&mut self, label: &str, component: Component, origin: Origin) -> Result<()> {
		let Some(entry) = self.get_mut(label) else {
			return self.insert(label, component, origin);
		};

		if entry.component.kind != component.kind || entry.component.plugin != component.plugin {
			return Err(ConfigurationError::ConflictingComponent {
				label: label.to_string(),
				existing: entry.component.describe(),
				incoming: component.describe(),
			});
		}

		entry.component.params.merge(&component.params, label)?;
		entry.component.extensible |= component.extensible;
		if !entry.origins.contains(&origin) {
			entry.origins.push(origin);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Value;

	fn csc_module(debug: bool) -> Component {
		Component::new(ComponentKind::EsProducer, "CSCGeometryESModule").with_params(
			ParameterSet::from_entries([
				("debugV", Value::from(debug)),
				("useRealWireGeometry", Value::from(true)),
			])
			.unwrap(),
		)
	}

	#[test]
	fn test_schedulable_kinds() {
		assert!(ComponentKind::Analyzer.is_schedulable());
		assert!(ComponentKind::Producer.is_schedulable());
		assert!(ComponentKind::Filter.is_schedulable());
		assert!(!ComponentKind::EsProducer.is_schedulable());
		assert!(!ComponentKind::Service.is_schedulable());
		assert!(!ComponentKind::Source.is_schedulable());
	}

	#[test]
	fn test_insert_rejects_duplicate_label() {
		let mut table = ComponentTable::new();
		table
			.insert("producer", Component::new(ComponentKind::Analyzer, "A"), Origin::Explicit)
			.unwrap();
		let err = table
			.insert("producer", Component::new(ComponentKind::Analyzer, "A"), Origin::Explicit)
			.unwrap_err();
		assert!(matches!(err, ConfigurationError::DuplicateLabel { .. }));
	}

	#[test]
	fn test_merge_records_provenance() {
		let mut table = ComponentTable::new();
		let unit = Origin::Unit("cscGeometry_cfi".to_string());
		table.merge("CSCGeometryESModule", csc_module(false), unit.clone()).unwrap();
		table.merge("CSCGeometryESModule", csc_module(true), unit.clone()).unwrap();
		table
			.merge(
				"CSCGeometryESModule",
				csc_module(true),
				Origin::Unit("local_cfi".to_string()),
			)
			.unwrap();

		let entry = table.get("CSCGeometryESModule").unwrap();
		assert_eq!(entry.component.params.get("debugV"), Some(&Value::from(true)));
		assert_eq!(
			entry.origins,
			vec![unit, Origin::Unit("local_cfi".to_string())]
		);
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn test_merge_rejects_different_plugin() {
		let mut table = ComponentTable::new();
		table
			.merge("CSCGeometryESModule", csc_module(false), Origin::Explicit)
			.unwrap();
		let other = Component::new(ComponentKind::EsProducer, "DTGeometryESModule");
		match table
			.merge("CSCGeometryESModule", other, Origin::Explicit)
			.unwrap_err()
		{
			ConfigurationError::ConflictingComponent {
				label,
				existing,
				incoming,
			} => {
				assert_eq!(label, "CSCGeometryESModule");
				assert_eq!(existing, "ESProducer(\"CSCGeometryESModule\")");
				assert_eq!(incoming, "ESProducer(\"DTGeometryESModule\")");
			}
			other => panic!("Expected ConflictingComponent, got {other:?}"),
		}
	}
}
