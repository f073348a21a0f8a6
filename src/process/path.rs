use crate::error::{ConfigurationError, Result};
use crate::process::component::ComponentTable;

/// A declared linear sequence of steps, referenced by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPath {
	pub name: String,
	pub steps: Vec<String>,
}

impl ExecutionPath {
	/// Declare a path. A path needs at least one step.
	pub fn new(name: impl Into<String>, steps: Vec<String>) -> Result<Self> {
		let name = name.into();
		if steps.is_empty() {
			return Err(ConfigurationError::EmptyPath { path: name });
		}
		Ok(ExecutionPath { name, steps })
	}

	/// Check every step against the registered modules.
	pub fn resolve(&self, modules: &ComponentTable) -> Result<()> {
		for step in &self.steps {
			let entry = modules
				.get(step)
				.ok_or_else(|| ConfigurationError::UndeclaredStep {
					path: self.name.clone(),
					step: step.clone(),
				})?;
			if !entry.component.kind.is_schedulable() {
				return Err(ConfigurationError::NotSchedulable {
					path: self.name.clone(),
					step: step.clone(),
					kind: entry.component.kind.to_string(),
				});
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::process::component::{Component, ComponentKind, Origin};

	fn modules() -> ComponentTable {
		let mut table = ComponentTable::new();
		table
			.insert(
				"producer",
				Component::new(ComponentKind::Analyzer, "CSCGeometryAnalyzer"),
				Origin::Explicit,
			)
			.unwrap();
		table
			.insert(
				"CSCGeometryESModule",
				Component::new(ComponentKind::EsProducer, "CSCGeometryESModule"),
				Origin::Unit("cscGeometry_cfi".to_string()),
			)
			.unwrap();
		table
	}

	#[test]
	fn test_empty_path_rejected() {
		let err = ExecutionPath::new("p1", Vec::new()).unwrap_err();
		assert!(matches!(err, ConfigurationError::EmptyPath { .. }));
	}

	#[test]
	fn test_resolve_registered_step() {
		let path = ExecutionPath::new("p1", vec!["producer".to_string()]).unwrap();
		assert!(path.resolve(&modules()).is_ok());
	}

	#[test]
	fn test_resolve_undeclared_step() {
		let path = ExecutionPath::new("p1", vec!["producer".to_string(), "dumper".to_string()])
			.unwrap();
		match path.resolve(&modules()).unwrap_err() {
			ConfigurationError::UndeclaredStep { path, step } => {
				assert_eq!(path, "p1");
				assert_eq!(step, "dumper");
			}
			other => panic!("Expected UndeclaredStep, got {other:?}"),
		}
	}

	#[test]
	fn test_resolve_es_module_not_schedulable() {
		let path = ExecutionPath::new("p1", vec!["CSCGeometryESModule".to_string()]).unwrap();
		match path.resolve(&modules()).unwrap_err() {
			ConfigurationError::NotSchedulable { kind, .. } => assert_eq!(kind, "ESProducer"),
			other => panic!("Expected NotSchedulable, got {other:?}"),
		}
	}
}
