use crate::config::{ParameterSet, Value};
use crate::error::{ConfigurationError, Result};
use std::fmt;

/// The only source type: produces empty events with generated ids.
pub const EMPTY_SOURCE: &str = "EmptySource";

const EMPTY_SOURCE_OPTIONS: &[&str] = &[
	"firstRun",
	"firstLuminosityBlock",
	"firstEvent",
	"numberEventsInRun",
	"numberEventsInLuminosityBlock",
];

/// Event count limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxEvents {
	/// `-1` means unlimited.
	pub input: i64,
}

impl Default for MaxEvents {
	fn default() -> Self {
		MaxEvents { input: -1 }
	}
}

impl MaxEvents {
	pub fn new(input: i64) -> Result<Self> {
		if input < -1 {
			return Err(ConfigurationError::InvalidValue {
				path: "maxEvents.input".to_string(),
				reason: format!("{} is neither -1 (unlimited) nor a count", input),
			});
		}
		Ok(MaxEvents { input })
	}

	/// Number of events the run may process; `None` when unlimited.
	pub fn permitted(&self) -> Option<u64> {
		u64::try_from(self.input).ok()
	}

	/// The `maxEvents` parameter set as it appears in the tree.
	pub fn to_pset(&self) -> ParameterSet {
		let mut pset = ParameterSet::new();
		pset.insert("input", Value::Int(self.input));
		pset
	}
}

/// Identity of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventId {
	pub run: u32,
	pub lumi: u32,
	pub event: u64,
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
	}
}

/// Validated `EmptySource` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptySourceConfig {
	pub first_run: u32,
	pub first_lumi: u32,
	pub first_event: u64,

	/// `0` means a single run.
	pub events_per_run: u64,

	/// `0` means a single luminosity block per run.
	pub events_per_lumi: u64,
}

impl Default for EmptySourceConfig {
	fn default() -> Self {
		EmptySourceConfig {
			first_run: 1,
			first_lumi: 1,
			first_event: 1,
			events_per_run: 0,
			events_per_lumi: 0,
		}
	}
}

fn positive<T: TryFrom<i64>>(pset: &ParameterSet, name: &str, min: i64, default: T) -> Result<T> {
	let scope = "source";
	let Some(raw) = pset.int_param(name, scope)? else {
		return Ok(default);
	};
	if raw < min {
		return Err(ConfigurationError::InvalidValue {
			path: format!("{}.{}", scope, name),
			reason: format!("must be at least {}", min),
		});
	}
	T::try_from(raw).map_err(|_| ConfigurationError::InvalidValue {
		path: format!("{}.{}", scope, name),
		reason: format!("{} is out of range", raw),
	})
}

impl EmptySourceConfig {
	pub fn from_pset(pset: &ParameterSet) -> Result<Self> {
		pset.check_known(EMPTY_SOURCE_OPTIONS, "source")?;
		let defaults = EmptySourceConfig::default();
		Ok(EmptySourceConfig {
			first_run: positive(pset, "firstRun", 1, defaults.first_run)?,
			first_lumi: positive(pset, "firstLuminosityBlock", 1, defaults.first_lumi)?,
			first_event: positive(pset, "firstEvent", 1, defaults.first_event)?,
			events_per_run: positive(pset, "numberEventsInRun", 0, defaults.events_per_run)?,
			events_per_lumi: positive(
				pset,
				"numberEventsInLuminosityBlock",
				0,
				defaults.events_per_lumi,
			)?,
		})
	}

	/// Id of the `index`-th generated event (zero based).
	///
	/// Event numbers continue from `first_event` in the first run and
	/// restart at 1 in later runs.
	pub fn event_id(&self, index: u64) -> EventId {
		let (run_offset, in_run) = match self.events_per_run {
			0 => (0, index),
			n => (index / n, index % n),
		};
		let lumi_offset = match self.events_per_lumi {
			0 => 0,
			n => in_run / n,
		};
		let event = if run_offset == 0 {
			self.first_event + in_run
		} else {
			1 + in_run
		};
		EventId {
			run: self
				.first_run
				.saturating_add(u32::try_from(run_offset).unwrap_or(u32::MAX)),
			lumi: self
				.first_lumi
				.saturating_add(u32::try_from(lumi_offset).unwrap_or(u32::MAX)),
			event,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_max_events_permitted() {
		assert_eq!(MaxEvents::new(1).unwrap().permitted(), Some(1));
		assert_eq!(MaxEvents::new(0).unwrap().permitted(), Some(0));
		assert_eq!(MaxEvents::new(-1).unwrap().permitted(), None);
		assert!(MaxEvents::new(-2).is_err());
		assert_eq!(MaxEvents::default().permitted(), None);
	}

	#[test]
	fn test_max_events_pset() {
		let pset = MaxEvents::new(1).unwrap().to_pset();
		assert_eq!(pset.get("input"), Some(&Value::Int(1)));
	}

	#[test]
	fn test_default_event_ids() {
		let source = EmptySourceConfig::from_pset(&ParameterSet::new()).unwrap();
		assert_eq!(
			source.event_id(0),
			EventId {
				run: 1,
				lumi: 1,
				event: 1
			}
		);
		assert_eq!(source.event_id(4).event, 5);
	}

	#[test]
	fn test_run_and_lumi_boundaries() {
		let pset = ParameterSet::from_entries([
			("firstRun", Value::from(100)),
			("firstEvent", Value::from(10)),
			("numberEventsInRun", Value::from(4)),
			("numberEventsInLuminosityBlock", Value::from(2)),
		])
		.unwrap();
		let source = EmptySourceConfig::from_pset(&pset).unwrap();
		let ids: Vec<String> = (0..6).map(|i| source.event_id(i).to_string()).collect();
		assert_eq!(
			ids,
			vec!["100:1:10", "100:1:11", "100:2:12", "100:2:13", "101:1:1", "101:1:2"]
		);
	}

	#[test]
	fn test_run_and_lumi_saturate_past_u32() {
		let index = 1u64 << 32;

		let per_run = EmptySourceConfig {
			events_per_run: 1,
			..EmptySourceConfig::default()
		};
		assert_eq!(per_run.event_id(index).run, u32::MAX);

		let per_lumi = EmptySourceConfig {
			events_per_lumi: 1,
			..EmptySourceConfig::default()
		};
		let id = per_lumi.event_id(index);
		assert_eq!(id.run, 1);
		assert_eq!(id.lumi, u32::MAX);
		assert_eq!(id.event, index + 1);
	}

	#[test]
	fn test_rejects_unknown_and_out_of_range() {
		let unknown = ParameterSet::from_entries([("fileNames", Value::from(&["a.root"][..]))]).unwrap();
		assert!(matches!(
			EmptySourceConfig::from_pset(&unknown),
			Err(ConfigurationError::UnknownParameter { .. })
		));

		let zero_run = ParameterSet::from_entries([("firstRun", Value::from(0))]).unwrap();
		assert!(matches!(
			EmptySourceConfig::from_pset(&zero_run),
			Err(ConfigurationError::InvalidValue { .. })
		));
	}
}
