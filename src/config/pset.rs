use crate::config::value::{Value, ValueKind};
use crate::error::{ConfigurationError, Result};
use std::fmt;

/// A nested, ordered mapping of parameter names to values.
///
/// Lookup ignores order; iteration follows declaration order so dumps read
/// the same way the configuration was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
	entries: Vec<(String, Value)>,
}

/// Join a scope and a name into a dotted path.
pub fn join_path(scope: &str, name: &str) -> String {
	if scope.is_empty() {
		name.to_string()
	} else {
		format!("{}.{}", scope, name)
	}
}

fn check_name(name: &str) -> Result<()> {
	if name.is_empty() {
		return Err(ConfigurationError::InvalidName {
			name: name.to_string(),
			reason: "parameter names cannot be empty",
		});
	}
	if name.contains('.') {
		return Err(ConfigurationError::InvalidName {
			name: name.to_string(),
			reason: "parameter names cannot contain '.'",
		});
	}
	Ok(())
}

impl ParameterSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a set from `(name, value)` pairs, declaring each in turn.
	pub fn from_entries<I, N>(entries: I) -> Result<Self>
	where
		I: IntoIterator<Item = (N, Value)>,
		N: Into<String>,
	{
		let mut pset = ParameterSet::new();
		for (name, value) in entries {
			pset.declare(name, value)?;
		}
		Ok(pset)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.entries
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v)
	}

	pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
		self.entries
			.iter_mut()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v)
	}

	/// Look up a value by dotted path, descending through nested sets.
	pub fn get_path(&self, path: &str) -> Option<&Value> {
		match path.split_once('.') {
			None => self.get(path),
			Some((head, rest)) => self.get(head)?.as_pset()?.get_path(rest),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(n, v)| (n.as_str(), v))
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(n, _)| n.as_str())
	}

	/// Declare a new parameter in this scope.
	///
	/// A name may only be declared once per scope.
	pub fn declare(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
		let name = name.into();
		check_name(&name)?;
		if self.contains(&name) {
			return Err(ConfigurationError::DuplicateParameter { path: name });
		}
		self.entries.push((name, value));
		Ok(())
	}

	/// Assign a leaf, replacing any previous value regardless of its kind.
	/// Returns the replaced value.
	pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
		let name = name.into();
		match self.get_mut(&name) {
			Some(slot) => Some(std::mem::replace(slot, value)),
			None => {
				self.entries.push((name, value));
				None
			}
		}
	}

	/// Merge `other` into this set.
	///
	/// Absent names are added, nested sets merge recursively, and leaves of
	/// the same kind are overwritten by `other`. `scope` is the dotted path
	/// of this set, used in error messages.
	pub fn merge(&mut self, other: &ParameterSet, scope: &str) -> Result<()> {
		for (name, incoming) in &other.entries {
			let path = join_path(scope, name);
			match self.get_mut(name) {
				None => self.entries.push((name.clone(), incoming.clone())),
				Some(existing) => match (existing, incoming) {
					(Value::PSet(ours), Value::PSet(theirs)) => ours.merge(theirs, &path)?,
					(slot, value) if slot.kind() == value.kind() => *slot = value.clone(),
					(slot, value) => {
						return Err(ConfigurationError::TypeMismatch {
							path,
							expected: slot.kind(),
							found: value.kind(),
						});
					}
				},
			}
		}
		Ok(())
	}

	/// Override the parameter at a dotted path.
	///
	/// The new value must have the kind already declared at that path. A
	/// path that does not exist is rejected unless `extensible` is set, in
	/// which case it is declared along with any missing intermediate sets.
	/// Returns the replaced value, if any.
	pub fn set_path(
		&mut self,
		path: &str,
		value: Value,
		extensible: bool,
		scope: &str,
	) -> Result<Option<Value>> {
		let (head, rest) = match path.split_once('.') {
			Some((head, rest)) => (head, Some(rest)),
			None => (path, None),
		};
		check_name(head)?;
		let full = join_path(scope, head);

		let Some(rest) = rest else {
			if let Some(slot) = self.get_mut(head) {
				if slot.kind() != value.kind() {
					return Err(ConfigurationError::TypeMismatch {
						path: full,
						expected: slot.kind(),
						found: value.kind(),
					});
				}
				return Ok(Some(std::mem::replace(slot, value)));
			}
			if !extensible {
				return Err(ConfigurationError::UnknownParameter { path: full });
			}
			self.entries.push((head.to_string(), value));
			return Ok(None);
		};

		if !self.contains(head) {
			if !extensible {
				return Err(ConfigurationError::UnknownParameter {
					path: join_path(scope, path),
				});
			}
			self.entries
				.push((head.to_string(), Value::PSet(ParameterSet::new())));
		}

		match self.get_mut(head) {
			Some(Value::PSet(nested)) => nested.set_path(rest, value, extensible, &full),
			Some(other) => Err(ConfigurationError::TypeMismatch {
				path: full,
				expected: other.kind(),
				found: ValueKind::PSet,
			}),
			None => Err(ConfigurationError::UnknownParameter { path: full }),
		}
	}

	/// Reject any parameter whose name is not in `allowed`.
	pub fn check_known(&self, allowed: &[&str], scope: &str) -> Result<()> {
		match self.names().find(|name| !allowed.contains(name)) {
			Some(name) => Err(ConfigurationError::UnknownParameter {
				path: join_path(scope, name),
			}),
			None => Ok(()),
		}
	}

	fn typed<'a, T>(
		&'a self,
		name: &str,
		scope: &str,
		expected: ValueKind,
		extract: impl FnOnce(&'a Value) -> Option<T>,
	) -> Result<Option<T>> {
		let Some(value) = self.get(name) else {
			return Ok(None);
		};
		extract(value)
			.map(Some)
			.ok_or_else(|| ConfigurationError::TypeMismatch {
				path: join_path(scope, name),
				expected,
				found: value.kind(),
			})
	}

	/// Typed lookups: `Ok(None)` when absent, `TypeMismatch` when present
	/// with another kind.
	pub fn bool_param(&self, name: &str, scope: &str) -> Result<Option<bool>> {
		self.typed(name, scope, ValueKind::Bool, Value::as_bool)
	}

	pub fn int_param(&self, name: &str, scope: &str) -> Result<Option<i64>> {
		self.typed(name, scope, ValueKind::Int, Value::as_int)
	}

	pub fn str_param(&self, name: &str, scope: &str) -> Result<Option<&str>> {
		self.typed(name, scope, ValueKind::String, Value::as_str)
	}

	pub fn vstring_param(&self, name: &str, scope: &str) -> Result<Option<&[String]>> {
		self.typed(name, scope, ValueKind::VString, Value::as_vstring)
	}

	pub fn pset_param(&self, name: &str, scope: &str) -> Result<Option<&ParameterSet>> {
		self.typed(name, scope, ValueKind::PSet, Value::as_pset)
	}

	/// Every leaf value with its dotted path, in declaration order.
	///
	/// An empty nested set counts as a leaf so that it still shows up.
	pub fn leaf_paths(&self, prefix: &str) -> Vec<(String, &Value)> {
		let mut leaves = Vec::new();
		for (name, value) in &self.entries {
			let path = join_path(prefix, name);
			match value {
				Value::PSet(nested) if !nested.is_empty() => {
					leaves.extend(nested.leaf_paths(&path));
				}
				_ => leaves.push((path, value)),
			}
		}
		leaves
	}

	pub(crate) fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
		let pad = "    ".repeat(indent);
		for (name, value) in &self.entries {
			match value {
				Value::PSet(nested) => {
					writeln!(f, "{}{} = PSet(", pad, name)?;
					nested.write_indented(f, indent + 1)?;
					writeln!(f, "{}),", pad)?;
				}
				_ => writeln!(f, "{}{} = {}({}),", pad, name, value.kind(), value)?,
			}
		}
		Ok(())
	}
}

impl fmt::Display for ParameterSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.write_indented(f, 0)
	}
}
