//! Process-wide services.
//!
//! This module handles:
//! - Validating service options into typed configurations
//! - The `MessageLogger` destinations as `tracing` layers
//! - The floating-point exception guard

pub mod fpe;
pub mod message_logger;

pub use fpe::{FloatingPointException, FloatingPointTrap, FpeConfig, FpeGuard};
pub use message_logger::{DestinationConfig, MessageLoggerConfig, Severity};

use crate::config::ParameterSet;
use crate::error::{ConfigurationError, Result};

/// A validated service configuration.
#[derive(Debug, Clone)]
pub enum ServiceConfig {
	MessageLogger(MessageLoggerConfig),
	FloatingPointExceptions(FpeConfig),
}

/// Names of the services the registrar accepts.
pub const KNOWN_SERVICES: &[&str] = &[message_logger::SERVICE_NAME, fpe::SERVICE_NAME];

/// Validate a service's options by service type.
pub fn validate_service(name: &str, params: &ParameterSet) -> Result<ServiceConfig> {
	match name {
		message_logger::SERVICE_NAME => {
			MessageLoggerConfig::from_pset(params).map(ServiceConfig::MessageLogger)
		}
		fpe::SERVICE_NAME => FpeConfig::from_pset(params).map(ServiceConfig::FloatingPointExceptions),
		_ => Err(ConfigurationError::UnknownService {
			name: name.to_string(),
		}),
	}
}
