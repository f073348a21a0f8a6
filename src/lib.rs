//! pset - compose, validate and plan process configurations.
//!
//! This library provides the core functionality for pset, including:
//! - Typed parameter sets with deep merge and dotted-path overrides
//! - Process and unit file parsing with unit search path discovery
//! - Defaults-producing units resolved from files and built-ins
//! - Process assembly with provenance, paths and service validation
//! - The `MessageLogger` service as `tracing` layers and a floating-point guard
//! - Dry-run execution planning for the empty source
//!
//! # Example
//!
//! ```no_run
//! use pset_cli::exec::ExecutionPlan;
//! use pset_cli::process::load_process;
//! use std::path::Path;
//!
//! let process = load_process(Path::new("process.toml"), &[]).unwrap();
//! println!("{:?}", process.get("CSCGeometryESModule.debugV"));
//!
//! let plan = ExecutionPlan::new(&process).unwrap();
//! plan.dispatch(|id, step| println!("{} -> {}", id, step.label));
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod process;
pub mod services;
pub mod units;

pub use error::{ConfigurationError, Result};
