use crate::config::ValueKind;
use std::path::PathBuf;

/// Library-level structured errors raised while assembling a process.
///
/// Every variant is a configuration-time failure: assembly stops at the first
/// one and nothing is executed. The CLI binary wraps these with `anyhow` for
/// context chains.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
	#[error("Process file not found: {path}")]
	ProcessFileNotFound { path: PathBuf },

	#[error("Failed to read config file: {path}")]
	ConfigReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse config file: {path}")]
	ConfigParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Unit not found: {name} (searched {searched} unit directories)")]
	UnitNotFound { name: String, searched: usize },

	#[error("Parameter declared twice: {path}")]
	DuplicateParameter { path: String },

	#[error("Label declared twice: {label}")]
	DuplicateLabel { label: String },

	#[error("Invalid name {name:?}: {reason}")]
	InvalidName { name: String, reason: &'static str },

	#[error("Type mismatch at {path}: declared {expected}, got {found}")]
	TypeMismatch {
		path: String,
		expected: ValueKind,
		found: ValueKind,
	},

	#[error("Unknown parameter: {path}")]
	UnknownParameter { path: String },

	#[error("Unknown component: {label}")]
	UnknownComponent { label: String },

	#[error("Component {label} is already a {existing}, cannot redefine it as {incoming}")]
	ConflictingComponent {
		label: String,
		existing: String,
		incoming: String,
	},

	#[error("Unsupported value at {path}: {reason}")]
	UnsupportedValue { path: String, reason: String },

	#[error("Invalid value at {path}: {reason}")]
	InvalidValue { path: String, reason: String },

	#[error("Path {path} has no steps")]
	EmptyPath { path: String },

	#[error("Path {path} references undeclared step: {step}")]
	UndeclaredStep { path: String, step: String },

	#[error("Path {path} references {step}, which is a {kind} and cannot be scheduled")]
	NotSchedulable {
		path: String,
		step: String,
		kind: String,
	},

	#[error("Unknown service: {name}")]
	UnknownService { name: String },

	#[error("Unknown source type: {plugin}")]
	UnknownSource { plugin: String },

	#[error("No event source declared")]
	MissingSource,

	#[error("Event count is unlimited but the source never runs dry")]
	UnboundedRun,

	#[error("Invalid wildcard pattern: {pattern}")]
	InvalidRegex {
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Failed to open log destination: {path}")]
	LogFileError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to resolve home directory")]
	HomeDirectoryNotFound,
}

/// Result type alias using ConfigurationError.
pub type Result<T> = std::result::Result<T, ConfigurationError>;
