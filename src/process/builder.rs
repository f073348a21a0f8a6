use crate::config::{Value, ValueKind};
use crate::error::{ConfigurationError, Result};
use crate::exec::source::{EMPTY_SOURCE, EmptySourceConfig, MaxEvents};
use crate::process::component::{Component, ComponentKind, ComponentTable, Origin};
use crate::process::path::ExecutionPath;
use crate::process::Process;
use crate::services::{KNOWN_SERVICES, ServiceConfig, validate_service};
use crate::units::{Catalog, UnitOrigin};
use tracing::{debug, info};

/// Accumulates a process configuration.
///
/// Loads and declarations apply immediately and fail fast. Overrides are
/// recorded and applied by [`ProcessBuilder::build`] after everything
/// else, so an override always beats the value a load supplied.
#[derive(Debug)]
pub struct ProcessBuilder<'c> {
	name: String,
	catalog: &'c Catalog,
	modules: ComponentTable,
	services: ComponentTable,
	source: Option<Component>,
	max_events: MaxEvents,
	paths: Vec<ExecutionPath>,
	overrides: Vec<(String, Value)>,
	units: Vec<(String, UnitOrigin)>,
}

impl<'c> ProcessBuilder<'c> {
	pub fn new(name: impl Into<String>, catalog: &'c Catalog) -> Self {
		ProcessBuilder {
			name: name.into(),
			catalog,
			modules: ComponentTable::new(),
			services: ComponentTable::new(),
			source: None,
			max_events: MaxEvents::default(),
			paths: Vec::new(),
			overrides: Vec::new(),
			units: Vec::new(),
		}
	}

	/// Load a unit and merge its components into the tree.
	pub fn load(&mut self, name: &str) -> Result<&mut Self> {
		let loaded = self.catalog.load(name)?;
		debug!(unit = name, origin = %loaded.origin, components = loaded.components.len(), "loading unit");

		for labelled in loaded.components {
			let origin = Origin::Unit(loaded.name.clone());
			match labelled.component.kind {
				ComponentKind::Source => {
					return Err(ConfigurationError::InvalidValue {
						path: labelled.label,
						reason: format!("unit {} cannot declare the event source", name),
					});
				}
				ComponentKind::Service => {
					check_service_name(&labelled.label)?;
					self.services
						.merge(&labelled.label, labelled.component, origin)?
				}
				_ => self
					.modules
					.merge(&labelled.label, labelled.component, origin)?,
			}
		}

		self.units.push((loaded.name, loaded.origin));
		Ok(self)
	}

	/// Declare a module under a new label.
	pub fn add_module(&mut self, label: &str, component: Component) -> Result<&mut Self> {
		if matches!(component.kind, ComponentKind::Service | ComponentKind::Source) {
			return Err(ConfigurationError::InvalidValue {
				path: label.to_string(),
				reason: format!("a {} is not a module", component.kind),
			});
		}
		self.modules.insert(label, component, Origin::Explicit)?;
		Ok(self)
	}

	/// Register a service, keyed by its type.
	///
	/// A service a unit already provided is configured in place: the
	/// explicit options merge over the unit's.
	pub fn add_service(&mut self, component: Component) -> Result<&mut Self> {
		if component.kind != ComponentKind::Service {
			return Err(ConfigurationError::InvalidValue {
				path: component.plugin.clone(),
				reason: format!("a {} is not a service", component.kind),
			});
		}
		check_service_name(&component.plugin)?;
		let label = component.plugin.clone();
		let from_unit = self
			.services
			.get(&label)
			.is_some_and(|entry| !entry.origins.contains(&Origin::Explicit));
		if from_unit {
			debug!(service = %label, "configuring unit-provided service");
			self.services.merge(&label, component, Origin::Explicit)?;
		} else {
			self.services.insert(&label, component, Origin::Explicit)?;
		}
		Ok(self)
	}

	/// Declare the event source.
	pub fn set_source(&mut self, component: Component) -> Result<&mut Self> {
		if component.kind != ComponentKind::Source || component.plugin != EMPTY_SOURCE {
			return Err(ConfigurationError::UnknownSource {
				plugin: component.plugin,
			});
		}
		if self.source.is_some() {
			return Err(ConfigurationError::DuplicateLabel {
				label: "source".to_string(),
			});
		}
		self.source = Some(component);
		Ok(self)
	}

	/// Cap the number of events; `-1` lifts the cap.
	pub fn set_max_events(&mut self, input: i64) -> Result<&mut Self> {
		self.max_events = MaxEvents::new(input)?;
		Ok(self)
	}

	/// Declare a linear path. Steps are checked at build time.
	pub fn declare_path(&mut self, name: &str, steps: Vec<String>) -> Result<&mut Self> {
		if self.paths.iter().any(|p| p.name == name) {
			return Err(ConfigurationError::DuplicateLabel {
				label: name.to_string(),
			});
		}
		self.paths.push(ExecutionPath::new(name, steps)?);
		Ok(self)
	}

	/// Record an override of `label.param[.nested...]`, `source.param` or
	/// `maxEvents.input`.
	pub fn override_param(&mut self, path: &str, value: Value) -> &mut Self {
		self.overrides.push((path.to_string(), value));
		self
	}

	/// Apply overrides, validate the whole tree and freeze it.
	pub fn build(mut self) -> Result<Process> {
		for (path, value) in std::mem::take(&mut self.overrides) {
			self.apply_override(&path, value)?;
		}

		let source = self.source.ok_or(ConfigurationError::MissingSource)?;
		let source_config = EmptySourceConfig::from_pset(&source.params)?;

		for path in &self.paths {
			if self.modules.contains(&path.name) {
				return Err(ConfigurationError::DuplicateLabel {
					label: path.name.clone(),
				});
			}
			path.resolve(&self.modules)?;
		}

		let mut message_logger = None;
		let mut fpe = None;
		for entry in self.services.iter() {
			match validate_service(&entry.label, &entry.component.params)? {
				ServiceConfig::MessageLogger(config) => message_logger = Some(config),
				ServiceConfig::FloatingPointExceptions(config) => fpe = Some(config),
			}
		}

		info!(
			process = %self.name,
			modules = self.modules.len(),
			services = self.services.len(),
			paths = self.paths.len(),
			"process assembled"
		);

		Ok(Process {
			name: self.name,
			modules: self.modules,
			services: self.services,
			source,
			source_config,
			max_events: self.max_events,
			max_events_pset: self.max_events.to_pset(),
			paths: self.paths,
			units: self.units,
			message_logger,
			fpe,
		})
	}

	fn apply_override(&mut self, path: &str, value: Value) -> Result<()> {
		let Some((root, rest)) = path.split_once('.') else {
			return Err(ConfigurationError::InvalidValue {
				path: path.to_string(),
				reason: "override paths start with a label, e.g. \"label.parameter\"".to_string(),
			});
		};

		let replaced = match root {
			"maxEvents" => {
				if rest != "input" {
					return Err(ConfigurationError::UnknownParameter {
						path: path.to_string(),
					});
				}
				let Value::Int(input) = value else {
					return Err(ConfigurationError::TypeMismatch {
						path: path.to_string(),
						expected: ValueKind::Int,
						found: value.kind(),
					});
				};
				let previous = self.max_events.input;
				self.max_events = MaxEvents::new(input)?;
				Some(Value::Int(previous))
			}
			"source" => {
				let source = self.source.as_mut().ok_or(ConfigurationError::MissingSource)?;
				source.params.set_path(rest, value, source.extensible, root)?
			}
			label => {
				let entry = match self.modules.get_mut(label) {
					Some(entry) => entry,
					None => self.services.get_mut(label).ok_or_else(|| {
						ConfigurationError::UnknownComponent {
							label: label.to_string(),
						}
					})?,
				};
				let extensible = entry.component.extensible;
				entry.component.params.set_path(rest, value, extensible, label)?
			}
		};

		debug!(path, replaced = ?replaced, "override applied");
		Ok(())
	}
}

fn check_service_name(name: &str) -> Result<()> {
	if KNOWN_SERVICES.contains(&name) {
		Ok(())
	} else {
		Err(ConfigurationError::UnknownService {
			name: name.to_string(),
		})
	}
}
