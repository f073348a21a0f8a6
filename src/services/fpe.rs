//! The `EnableFloatingPointExceptions` service.
//!
//! Hardware traps are not touched. Instead, [`FpeGuard`] classifies results
//! of floating-point operations and fails on the conditions the service
//! enables.

use crate::config::ParameterSet;
use crate::error::Result;
use std::fmt;

pub const SERVICE_NAME: &str = "EnableFloatingPointExceptions";

const OPTIONS: &[&str] = &[
	"enableOverFlowEx",
	"enableDivByZeroEx",
	"enableInvalidEx",
	"enableUnderFlowEx",
];

/// The IEEE 754 conditions the guard can trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatingPointException {
	Overflow,
	DivByZero,
	Invalid,
	Underflow,
}

impl fmt::Display for FloatingPointException {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FloatingPointException::Overflow => "overflow",
			FloatingPointException::DivByZero => "division by zero",
			FloatingPointException::Invalid => "invalid operation",
			FloatingPointException::Underflow => "underflow",
		})
	}
}

/// A trapped floating-point condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Floating-point {exception} in {operation}")]
pub struct FloatingPointTrap {
	pub exception: FloatingPointException,
	pub operation: String,
}

/// Which conditions trap. Everything is off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FpeConfig {
	pub overflow: bool,
	pub div_by_zero: bool,
	pub invalid: bool,
	pub underflow: bool,
}

impl FpeConfig {
	pub fn from_pset(pset: &ParameterSet) -> Result<Self> {
		let scope = SERVICE_NAME;
		pset.check_known(OPTIONS, scope)?;
		Ok(FpeConfig {
			overflow: pset.bool_param("enableOverFlowEx", scope)?.unwrap_or(false),
			div_by_zero: pset.bool_param("enableDivByZeroEx", scope)?.unwrap_or(false),
			invalid: pset.bool_param("enableInvalidEx", scope)?.unwrap_or(false),
			underflow: pset.bool_param("enableUnderFlowEx", scope)?.unwrap_or(false),
		})
	}

	pub fn traps(&self, exception: FloatingPointException) -> bool {
		match exception {
			FloatingPointException::Overflow => self.overflow,
			FloatingPointException::DivByZero => self.div_by_zero,
			FloatingPointException::Invalid => self.invalid,
			FloatingPointException::Underflow => self.underflow,
		}
	}

	/// Enabled traps, for display.
	pub fn enabled(&self) -> Vec<FloatingPointException> {
		[
			FloatingPointException::Overflow,
			FloatingPointException::DivByZero,
			FloatingPointException::Invalid,
			FloatingPointException::Underflow,
		]
		.into_iter()
		.filter(|e| self.traps(*e))
		.collect()
	}
}

/// Checks floating-point results against the enabled traps.
#[derive(Debug, Clone, Copy, Default)]
pub struct FpeGuard {
	config: FpeConfig,
}

impl FpeGuard {
	pub fn new(config: FpeConfig) -> Self {
		FpeGuard { config }
	}

	pub fn config(&self) -> &FpeConfig {
		&self.config
	}

	fn raise(&self, exception: FloatingPointException, operation: &str) -> std::result::Result<(), FloatingPointTrap> {
		if self.config.traps(exception) {
			return Err(FloatingPointTrap {
				exception,
				operation: operation.to_string(),
			});
		}
		Ok(())
	}

	/// Classify a result computed from finite operands.
	pub fn check(&self, operation: &str, value: f64) -> std::result::Result<f64, FloatingPointTrap> {
		if value.is_nan() {
			self.raise(FloatingPointException::Invalid, operation)?;
		} else if value.is_infinite() {
			self.raise(FloatingPointException::Overflow, operation)?;
		} else if value.is_subnormal() {
			self.raise(FloatingPointException::Underflow, operation)?;
		}
		Ok(value)
	}

	/// Divide, raising division by zero for `x / 0` and invalid for `0 / 0`.
	pub fn div(&self, operation: &str, numerator: f64, denominator: f64) -> std::result::Result<f64, FloatingPointTrap> {
		let result = numerator / denominator;
		if denominator == 0.0 {
			if numerator == 0.0 || numerator.is_nan() {
				self.raise(FloatingPointException::Invalid, operation)?;
			} else {
				self.raise(FloatingPointException::DivByZero, operation)?;
			}
			return Ok(result);
		}
		if numerator.is_finite() && denominator.is_finite() {
			return self.check(operation, result);
		}
		Ok(result)
	}
}
