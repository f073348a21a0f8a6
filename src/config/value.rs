use crate::config::pset::ParameterSet;
use std::fmt;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Bool(bool),
	Int(i64),
	Double(f64),
	String(String),
	/// Ordered sequence of strings.
	VString(Vec<String>),
	/// Nested parameter set.
	PSet(ParameterSet),
}

/// The declared type of a value. Merges and overrides compare kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	Bool,
	Int,
	Double,
	String,
	VString,
	PSet,
}

impl ValueKind {
	/// Framework spelling of the type, as shown in dumps and errors.
	pub fn as_str(&self) -> &'static str {
		match self {
			ValueKind::Bool => "bool",
			ValueKind::Int => "int",
			ValueKind::Double => "double",
			ValueKind::String => "string",
			ValueKind::VString => "vstring",
			ValueKind::PSet => "PSet",
		}
	}
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Value {
	pub fn kind(&self) -> ValueKind {
		match self {
			Value::Bool(_) => ValueKind::Bool,
			Value::Int(_) => ValueKind::Int,
			Value::Double(_) => ValueKind::Double,
			Value::String(_) => ValueKind::String,
			Value::VString(_) => ValueKind::VString,
			Value::PSet(_) => ValueKind::PSet,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_double(&self) -> Option<f64> {
		match self {
			Value::Double(d) => Some(*d),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_vstring(&self) -> Option<&[String]> {
		match self {
			Value::VString(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_pset(&self) -> Option<&ParameterSet> {
		match self {
			Value::PSet(p) => Some(p),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Value::Int(i64::from(i))
	}
}

impl From<f64> for Value {
	fn from(d: f64) -> Self {
		Value::Double(d)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<Vec<String>> for Value {
	fn from(v: Vec<String>) -> Self {
		Value::VString(v)
	}
}

impl From<&[&str]> for Value {
	fn from(v: &[&str]) -> Self {
		Value::VString(v.iter().map(|s| s.to_string()).collect())
	}
}

impl From<ParameterSet> for Value {
	fn from(p: ParameterSet) -> Self {
		Value::PSet(p)
	}
}

/// Renders scalars and vstrings the way the framework prints them.
/// Nested sets are rendered inline; `ParameterSet`'s own `Display` is the
/// multi-line form.
impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Bool(b) => write!(f, "{}", b),
			Value::Int(i) => write!(f, "{}", i),
			Value::Double(d) => write!(f, "{:?}", d),
			Value::String(s) => write!(f, "'{}'", s),
			Value::VString(v) => {
				let quoted: Vec<String> = v.iter().map(|s| format!("'{}'", s)).collect();
				write!(f, "[{}]", quoted.join(", "))
			}
			Value::PSet(p) => {
				let inner: Vec<String> = p
					.iter()
					.map(|(name, value)| format!("{} = {}", name, value))
					.collect();
				write!(f, "{{ {} }}", inner.join(", "))
			}
		}
	}
}
