//! Dry-run scheduling of an assembled process.
//!
//! This module handles:
//! - Event ids generated by the empty source
//! - Ordering path steps into a schedule
//! - Dispatching events through the schedule, reporting progress via `tracing`
//!
//! Modules are not executed; the plan only shows what a run would do.

pub mod source;

use crate::error::{ConfigurationError, Result};
use crate::process::Process;
use crate::services::FpeGuard;
use source::EventId;
use tracing::{debug, info};

/// One module invocation in the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledStep<'p> {
	/// The first path that scheduled the module.
	pub path: &'p str,
	pub label: &'p str,
	pub plugin: &'p str,
}

/// The events a process would read and the modules each would visit.
#[derive(Debug)]
pub struct ExecutionPlan<'p> {
	process: &'p Process,
	event_count: u64,
	steps: Vec<ScheduledStep<'p>>,
}

impl<'p> ExecutionPlan<'p> {
	/// Plan a bounded run.
	///
	/// Steps run in path declaration order; a module on several paths runs
	/// once, where it first appears.
	pub fn new(process: &'p Process) -> Result<Self> {
		let event_count = process
			.max_events()
			.permitted()
			.ok_or(ConfigurationError::UnboundedRun)?;

		let mut steps: Vec<ScheduledStep<'p>> = Vec::new();
		for path in process.paths() {
			for label in &path.steps {
				if steps.iter().any(|s| s.label == label.as_str()) {
					continue;
				}
				let entry = process
					.component(label)
					.ok_or_else(|| ConfigurationError::UndeclaredStep {
						path: path.name.clone(),
						step: label.clone(),
					})?;
				steps.push(ScheduledStep {
					path: path.name.as_str(),
					label: label.as_str(),
					plugin: entry.component.plugin.as_str(),
				});
			}
		}

		Ok(ExecutionPlan {
			process,
			event_count,
			steps,
		})
	}

	pub fn event_count(&self) -> u64 {
		self.event_count
	}

	pub fn steps(&self) -> &[ScheduledStep<'p>] {
		&self.steps
	}

	/// Ids of the events the source would produce.
	pub fn events(&self) -> impl Iterator<Item = EventId> + '_ {
		let source = *self.process.source_config();
		(0..self.event_count).map(move |index| source.event_id(index))
	}

	/// Guard configured by the process's floating-point service, if any.
	pub fn fpe_guard(&self) -> FpeGuard {
		FpeGuard::new(self.process.fpe().copied().unwrap_or_default())
	}

	/// Walk every event through the schedule, calling `visit` for each
	/// step. Returns the number of events processed.
	pub fn dispatch<F>(&self, mut visit: F) -> u64
	where
		F: FnMut(&EventId, &ScheduledStep<'p>),
	{
		let mut processed = 0;
		for id in self.events() {
			processed += 1;
			info!(
				category = "FwkReport",
				"Begin processing the {} record. Run {}, Event {}, LumiSection {}",
				ordinal(processed),
				id.run,
				id.event,
				id.lumi
			);
			for step in &self.steps {
				debug!(
					category = "Schedule",
					module = step.label,
					"{} on path {} for event {}",
					step.plugin,
					step.path,
					id
				);
				visit(&id, step);
			}
		}
		info!(
			category = "FwkSummary",
			"Process {} processed {} events",
			self.process.name(),
			processed
		);
		processed
	}
}

fn ordinal(n: u64) -> String {
	let suffix = match (n % 10, n % 100) {
		(_, 11..=13) => "th",
		(1, _) => "st",
		(2, _) => "nd",
		(3, _) => "rd",
		_ => "th",
	};
	format!("{}{}", n, suffix)
}
