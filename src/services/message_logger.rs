//! The `MessageLogger` service.
//!
//! The service options are validated into a [`MessageLoggerConfig`], which
//! then builds a `tracing` subscriber with one layer per destination. Each
//! destination applies its own threshold and per-category limits, so the
//! same record can reach `debug` and be dropped by `errors`.

use crate::config::ParameterSet;
use crate::config::pset::join_path;
use crate::error::{ConfigurationError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

pub const SERVICE_NAME: &str = "MessageLogger";

const DEFAULT_EXTENSION: &str = ".log";
const DEFAULT_DESTINATION: &str = "cerr";
const DEFAULT_LIMIT_KEY: &str = "default";

const DESTINATION_OPTIONS: &[&str] = &["threshold", "extension", "filename", "noLineBreaks"];

/// Message severity, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
	Debug,
	Info,
	Warning,
	Error,
}

impl Severity {
	pub fn parse(s: &str) -> Option<Self> {
		match s.to_ascii_uppercase().as_str() {
			"DEBUG" => Some(Severity::Debug),
			"INFO" => Some(Severity::Info),
			"WARNING" | "WARN" => Some(Severity::Warning),
			"ERROR" => Some(Severity::Error),
			_ => None,
		}
	}

	pub fn from_level(level: &Level) -> Self {
		match *level {
			Level::ERROR => Severity::Error,
			Level::WARN => Severity::Warning,
			Level::INFO => Severity::Info,
			_ => Severity::Debug,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Severity::Debug => "DEBUG",
			Severity::Info => "INFO",
			Severity::Warning => "WARNING",
			Severity::Error => "ERROR",
		}
	}

	fn marker(&self) -> char {
		match self {
			Severity::Debug => 'd',
			Severity::Info => 'i',
			Severity::Warning => 'w',
			Severity::Error => 'e',
		}
	}
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Message limit: `-1` unlimited, `0` none, `n` the first `n` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
	Unlimited,
	AtMost(u64),
}

impl Limit {
	fn from_int(limit: i64, path: &str) -> Result<Self> {
		match limit {
			-1 => Ok(Limit::Unlimited),
			n if n >= 0 => Ok(Limit::AtMost(n as u64)),
			n => Err(ConfigurationError::InvalidValue {
				path: path.to_string(),
				reason: format!("limit {} is below -1", n),
			}),
		}
	}
}

/// Where a destination writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationTarget {
	Stdout,
	Stderr,
	File(String),
}

/// One configured output stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationConfig {
	pub name: String,
	pub threshold: Severity,
	pub extension: String,
	pub filename: Option<String>,
	pub no_line_breaks: bool,

	/// Limits keyed by category, severity name or `default`.
	pub limits: Vec<(String, Limit)>,
}

impl DestinationConfig {
	fn with_defaults(name: &str) -> Self {
		DestinationConfig {
			name: name.to_string(),
			threshold: Severity::Info,
			extension: DEFAULT_EXTENSION.to_string(),
			filename: None,
			no_line_breaks: false,
			limits: Vec::new(),
		}
	}

	pub fn target(&self) -> DestinationTarget {
		match self.name.as_str() {
			"cout" => DestinationTarget::Stdout,
			"cerr" => DestinationTarget::Stderr,
			_ => {
				let base = self.filename.as_deref().unwrap_or(&self.name);
				DestinationTarget::File(format!("{}{}", base, self.extension))
			}
		}
	}

	fn limit_named(&self, key: &str) -> Option<Limit> {
		self.limits
			.iter()
			.find(|(name, _)| name == key)
			.map(|(_, limit)| *limit)
	}

	/// Category limit, else severity limit, else `default`, else unlimited.
	pub fn limit_for(&self, severity: Severity, category: &str) -> Limit {
		self.limit_named(category)
			.or_else(|| self.limit_named(severity.as_str()))
			.or_else(|| self.limit_named(DEFAULT_LIMIT_KEY))
			.unwrap_or(Limit::Unlimited)
	}

	fn from_pset(name: &str, pset: &ParameterSet, categories: &[String], scope: &str) -> Result<Self> {
		let mut dest = DestinationConfig::with_defaults(name);

		if let Some(threshold) = pset.str_param("threshold", scope)? {
			dest.threshold =
				Severity::parse(threshold).ok_or_else(|| ConfigurationError::InvalidValue {
					path: join_path(scope, "threshold"),
					reason: format!("unknown severity {:?}", threshold),
				})?;
		}
		if let Some(extension) = pset.str_param("extension", scope)? {
			dest.extension = extension.to_string();
		}
		if let Some(filename) = pset.str_param("filename", scope)? {
			dest.filename = Some(filename.to_string());
		}
		if let Some(no_line_breaks) = pset.bool_param("noLineBreaks", scope)? {
			dest.no_line_breaks = no_line_breaks;
		}

		for (key, value) in pset.iter() {
			if DESTINATION_OPTIONS.contains(&key) {
				continue;
			}
			let is_limit_key = key == DEFAULT_LIMIT_KEY
				|| Severity::parse(key).is_some_and(|s| s.as_str() == key)
				|| categories.iter().any(|c| c == key);
			let path = join_path(scope, key);
			let Some(limit_pset) = value.as_pset().filter(|_| is_limit_key) else {
				return Err(ConfigurationError::UnknownParameter { path });
			};
			limit_pset.check_known(&["limit"], &path)?;
			if let Some(limit) = limit_pset.int_param("limit", &path)? {
				dest.limits
					.push((key.to_string(), Limit::from_int(limit, &join_path(&path, "limit"))?));
			}
		}

		Ok(dest)
	}
}

/// Module-label wildcards enabled for debug output.
#[derive(Debug, Clone, Default)]
pub struct DebugModules {
	patterns: Vec<Regex>,
}

impl DebugModules {
	pub fn new(wildcards: &[String]) -> Result<Self> {
		let patterns = wildcards
			.iter()
			.map(|w| {
				let pattern = format!(
					"^{}$",
					w.split('*').map(regex::escape).collect::<Vec<_>>().join(".*")
				);
				Regex::new(&pattern).map_err(|source| ConfigurationError::InvalidRegex {
					pattern: w.clone(),
					source,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(DebugModules { patterns })
	}

	pub fn enabled(&self, module: &str) -> bool {
		self.patterns.iter().any(|p| p.is_match(module))
	}
}

/// Validated `MessageLogger` options.
#[derive(Debug, Clone)]
pub struct MessageLoggerConfig {
	pub destinations: Vec<DestinationConfig>,
	pub categories: Vec<String>,
	pub debug_modules: Vec<String>,
	debug_filter: DebugModules,
}

impl MessageLoggerConfig {
	/// Validate the service's parameter set.
	pub fn from_pset(pset: &ParameterSet) -> Result<Self> {
		let scope = SERVICE_NAME;

		let destination_names: Vec<String> = match pset.vstring_param("destinations", scope)? {
			Some(names) => names.to_vec(),
			None => vec![DEFAULT_DESTINATION.to_string()],
		};
		let categories = pset
			.vstring_param("categories", scope)?
			.map(<[String]>::to_vec)
			.unwrap_or_default();
		let debug_modules = pset
			.vstring_param("debugModules", scope)?
			.map(<[String]>::to_vec)
			.unwrap_or_default();

		let mut allowed: Vec<&str> = vec!["destinations", "categories", "debugModules"];
		allowed.extend(destination_names.iter().map(String::as_str));
		pset.check_known(&allowed, scope)?;

		let mut destinations = Vec::with_capacity(destination_names.len());
		for name in &destination_names {
			if destinations.iter().any(|d: &DestinationConfig| &d.name == name) {
				return Err(ConfigurationError::DuplicateLabel {
					label: join_path(scope, name),
				});
			}
			let dest_scope = join_path(scope, name);
			let dest = match pset.pset_param(name, scope)? {
				Some(dest_pset) => {
					DestinationConfig::from_pset(name, dest_pset, &categories, &dest_scope)?
				}
				None => DestinationConfig::with_defaults(name),
			};
			destinations.push(dest);
		}

		let debug_filter = DebugModules::new(&debug_modules)?;
		Ok(MessageLoggerConfig {
			destinations,
			categories,
			debug_modules,
			debug_filter,
		})
	}

	pub fn destination(&self, name: &str) -> Option<&DestinationConfig> {
		self.destinations.iter().find(|d| d.name == name)
	}

	/// Open every destination, file destinations under `output_dir`.
	pub fn layers(&self, output_dir: &Path) -> Result<Vec<DestinationLayer>> {
		self.destinations
			.iter()
			.map(|dest| {
				let writer: Box<dyn Write + Send> = match dest.target() {
					DestinationTarget::Stdout => Box::new(io::stdout()),
					DestinationTarget::Stderr => Box::new(io::stderr()),
					DestinationTarget::File(file_name) => {
						let path = output_dir.join(file_name);
						let file = File::create(&path)
							.map_err(|source| ConfigurationError::LogFileError { path, source })?;
						Box::new(file)
					}
				};
				Ok(DestinationLayer::new(dest.clone(), self.debug_filter.clone(), writer))
			})
			.collect()
	}

	/// A subscriber routing records to every destination.
	pub fn subscriber(&self, output_dir: &Path) -> Result<impl Subscriber + Send + Sync + 'static> {
		Ok(tracing_subscriber::registry().with(self.layers(output_dir)?))
	}
}

/// Fields of a record the logger cares about.
#[derive(Debug, Default)]
struct MessageFields {
	message: String,
	category: Option<String>,
	module: Option<String>,
}

impl Visit for MessageFields {
	fn record_str(&mut self, field: &Field, value: &str) {
		match field.name() {
			"message" => self.message = value.to_string(),
			"category" => self.category = Some(value.to_string()),
			"module" => self.module = Some(value.to_string()),
			_ => {}
		}
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		match field.name() {
			"message" => self.message = format!("{:?}", value),
			"category" => self.category = Some(format!("{:?}", value)),
			"module" => self.module = Some(format!("{:?}", value)),
			_ => {}
		}
	}
}

/// A `tracing` layer writing one destination.
pub struct DestinationLayer {
	config: DestinationConfig,
	debug_modules: DebugModules,
	counts: Mutex<HashMap<String, u64>>,
	writer: Mutex<Box<dyn Write + Send>>,
}

impl DestinationLayer {
	pub fn new(config: DestinationConfig, debug_modules: DebugModules, writer: Box<dyn Write + Send>) -> Self {
		DestinationLayer {
			config,
			debug_modules,
			counts: Mutex::new(HashMap::new()),
			writer: Mutex::new(writer),
		}
	}

	/// Count the message against its category and report whether it is
	/// still within the limit.
	fn admit(&self, severity: Severity, category: &str) -> bool {
		let Limit::AtMost(max) = self.config.limit_for(severity, category) else {
			return true;
		};
		let Ok(mut counts) = self.counts.lock() else {
			return false;
		};
		let seen = counts.entry(category.to_string()).or_insert(0);
		*seen += 1;
		*seen <= max
	}

	fn format(&self, severity: Severity, category: &str, module: &str, message: &str) -> String {
		let header = if module.is_empty() {
			format!("%MSG-{} {}:", severity.marker(), category)
		} else {
			format!("%MSG-{} {}: {}", severity.marker(), category, module)
		};
		if self.config.no_line_breaks {
			format!("{} {}\n", header, message)
		} else {
			format!("{}\n{}\n%MSG\n", header, message)
		}
	}
}

impl<S: Subscriber> Layer<S> for DestinationLayer {
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		let severity = Severity::from_level(event.metadata().level());
		if severity < self.config.threshold {
			return;
		}

		let mut fields = MessageFields::default();
		event.record(&mut fields);
		let category = fields
			.category
			.unwrap_or_else(|| event.metadata().target().to_string());
		let module = fields.module.unwrap_or_default();

		if severity == Severity::Debug && !self.debug_modules.enabled(&module) {
			return;
		}
		if !self.admit(severity, &category) {
			return;
		}

		let line = self.format(severity, &category, &module, &fields.message);
		if let Ok(mut writer) = self.writer.lock() {
			// A failing destination must not take the process down.
			let _ = writer.write_all(line.as_bytes());
			let _ = writer.flush();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Value, parse_process_str};
	use crate::config::parser::pset_from_table;
	use std::sync::Arc;

	#[derive(Clone, Default)]
	struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

	impl Write for SharedBuffer {
		fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	impl SharedBuffer {
		fn contents(&self) -> String {
			String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
		}
	}

	fn template_logger() -> MessageLoggerConfig {
		let file = parse_process_str(
			crate::config::template::generate_init_template(),
			Path::new("process.toml"),
		)
		.unwrap();
		let pset = pset_from_table(file.services.get(SERVICE_NAME).unwrap(), SERVICE_NAME).unwrap();
		MessageLoggerConfig::from_pset(&pset).unwrap()
	}

	fn capture(config: &MessageLoggerConfig, name: &str, emit: impl FnOnce()) -> String {
		let buffer = SharedBuffer::default();
		let layer = DestinationLayer::new(
			config.destination(name).unwrap().clone(),
			config.debug_filter.clone(),
			Box::new(buffer.clone()),
		);
		let subscriber = tracing_subscriber::registry().with(layer);
		tracing::subscriber::with_default(subscriber, emit);
		buffer.contents()
	}

	#[test]
	fn test_template_destinations_are_independent() {
		let config = template_logger();
		assert_eq!(config.destinations.len(), 3);
		assert_eq!(config.destination("errors").unwrap().threshold, Severity::Error);
		assert_eq!(config.destination("debug").unwrap().threshold, Severity::Debug);
		assert_eq!(config.destination("log").unwrap().threshold, Severity::Info);
		assert_eq!(
			config.destination("errors").unwrap().target(),
			DestinationTarget::File("errors.out".to_string())
		);
		assert_eq!(config.debug_modules, vec!["*"]);
	}

	#[test]
	fn test_limit_resolution_order() {
		let config = template_logger();
		let debug = config.destination("debug").unwrap();
		assert_eq!(debug.limit_for(Severity::Debug, "CSC"), Limit::Unlimited);
		assert_eq!(debug.limit_for(Severity::Debug, "Other"), Limit::AtMost(0));
		assert_eq!(debug.limit_for(Severity::Info, "Other"), Limit::AtMost(0));
		assert_eq!(debug.limit_for(Severity::Warning, "Other"), Limit::Unlimited);
	}

	#[test]
	fn test_debug_destination_filters_by_category() {
		let config = template_logger();
		let out = capture(&config, "debug", || {
			tracing::debug!(category = "CSC", module = "producer", "layer 1 built");
			tracing::debug!(category = "Schedule", module = "producer", "dropped");
			tracing::info!(category = "FwkReport", "also dropped");
			tracing::warn!(category = "Schedule", "kept");
		});
		assert!(out.contains("%MSG-d CSC: producer layer 1 built\n"));
		assert!(!out.contains("dropped"));
		assert!(out.contains("%MSG-w Schedule: kept\n"));
	}

	#[test]
	fn test_errors_destination_threshold() {
		let config = template_logger();
		let out = capture(&config, "errors", || {
			tracing::warn!(category = "CSC", "not severe enough");
			tracing::error!(category = "CSC", "geometry missing");
		});
		assert_eq!(out, "%MSG-e CSC:\ngeometry missing\n%MSG\n");
	}

	#[test]
	fn test_limit_counts_per_category() {
		let mut pset = ParameterSet::new();
		pset.declare("destinations", Value::from(&["log"][..])).unwrap();
		pset.declare("categories", Value::from(&["CSC"][..])).unwrap();
		let csc = ParameterSet::from_entries([("limit", Value::from(2))]).unwrap();
		let log = ParameterSet::from_entries([
			("noLineBreaks", Value::from(true)),
			("CSC", Value::from(csc)),
		])
		.unwrap();
		pset.declare("log", Value::from(log)).unwrap();
		let config = MessageLoggerConfig::from_pset(&pset).unwrap();

		let out = capture(&config, "log", || {
			for i in 0..5 {
				tracing::info!(category = "CSC", "message {}", i);
			}
			tracing::info!(category = "Other", "unlimited");
		});
		assert_eq!(out.lines().count(), 3);
		assert!(out.contains("message 1"));
		assert!(!out.contains("message 2"));
		assert!(out.contains("unlimited"));
	}

	#[test]
	fn test_debug_modules_wildcards() {
		let modules = DebugModules::new(&["CSC*".to_string(), "producer".to_string()]).unwrap();
		assert!(modules.enabled("CSCGeometryESModule"));
		assert!(modules.enabled("producer"));
		assert!(!modules.enabled("producer2"));
		assert!(!DebugModules::new(&[]).unwrap().enabled("producer"));
	}

	#[test]
	fn test_default_destination_is_cerr() {
		let config = MessageLoggerConfig::from_pset(&ParameterSet::new()).unwrap();
		assert_eq!(config.destinations.len(), 1);
		assert_eq!(config.destinations[0].target(), DestinationTarget::Stderr);
	}

	#[test]
	fn test_unknown_option_rejected() {
		let pset = ParameterSet::from_entries([("fwkJobReports", Value::from(&["x"][..]))]).unwrap();
		match MessageLoggerConfig::from_pset(&pset).unwrap_err() {
			ConfigurationError::UnknownParameter { path } => {
				assert_eq!(path, "MessageLogger.fwkJobReports")
			}
			other => panic!("Expected UnknownParameter, got {other:?}"),
		}
	}

	#[test]
	fn test_undeclared_category_limit_rejected() {
		let limit = ParameterSet::from_entries([("limit", Value::from(-1))]).unwrap();
		let debug = ParameterSet::from_entries([("CSC", Value::from(limit))]).unwrap();
		let pset = ParameterSet::from_entries([
			("destinations", Value::from(&["debug"][..])),
			("debug", Value::from(debug)),
		])
		.unwrap();
		match MessageLoggerConfig::from_pset(&pset).unwrap_err() {
			ConfigurationError::UnknownParameter { path } => {
				assert_eq!(path, "MessageLogger.debug.CSC")
			}
			other => panic!("Expected UnknownParameter, got {other:?}"),
		}
	}

	#[test]
	fn test_bad_threshold_rejected() {
		let errors = ParameterSet::from_entries([("threshold", Value::from("FATAL"))]).unwrap();
		let pset = ParameterSet::from_entries([
			("destinations", Value::from(&["errors"][..])),
			("errors", Value::from(errors)),
		])
		.unwrap();
		assert!(matches!(
			MessageLoggerConfig::from_pset(&pset),
			Err(ConfigurationError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_file_layers_created_in_output_dir() {
		let config = template_logger();
		let dir = tempfile::tempdir().unwrap();
		let layers = config.layers(dir.path()).unwrap();
		assert_eq!(layers.len(), 3);
		for name in ["log.out", "errors.out", "debug.out"] {
			assert!(dir.path().join(name).exists(), "{name} missing");
		}
	}
}
