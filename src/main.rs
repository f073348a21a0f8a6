use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use pset_cli::config::template::generate_init_template;
use pset_cli::config::unit_search_path;
use pset_cli::exec::source::EventId;
use pset_cli::exec::{ExecutionPlan, ScheduledStep};
use pset_cli::process::{Process, load_process};
use pset_cli::units::Catalog;

/// Environment variable holding the diagnostics filter, e.g. `pset_cli=debug`.
const LOG_ENV_VAR: &str = "PSET_LOG";

const PROCESS_FILE: &str = "process.toml";

#[derive(Parser)]
#[command(name = "pset")]
#[command(
	author,
	version,
	about = "Compose, validate and plan process configurations from parameter-set units"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Extra directory to search for unit files (repeatable, searched first)
	#[arg(short = 'I', long = "unit-dir", value_name = "DIR", global = true)]
	unit_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
	/// Create a template process.toml in the current directory
	Init {
		/// Overwrite an existing process.toml
		#[arg(long)]
		force: bool,
	},
	/// Assemble a process file and report configuration errors
	Validate {
		/// Process file to check
		file: PathBuf,
	},
	/// Print the merged configuration tree with provenance
	Dump {
		/// Process file to dump
		file: PathBuf,

		/// Print one dotted parameter path per line
		#[arg(long)]
		flat: bool,
	},
	/// List available units
	Units,
	/// Show the events and module schedule a run would go through
	Plan {
		/// Process file to plan
		file: PathBuf,

		/// Directory for MessageLogger file destinations
		#[arg(long, value_name = "DIR", default_value = ".")]
		log_dir: PathBuf,
	},
}

fn main() -> ExitCode {
	init_logging();
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging() {
	let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
	// A global subscriber can only fail to install if one already exists.
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init();
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Init { force } => handle_init(force),
		Commands::Validate { file } => handle_validate(&file, &cli.unit_dirs),
		Commands::Dump { file, flat } => handle_dump(&file, &cli.unit_dirs, flat),
		Commands::Units => handle_units(&cli.unit_dirs),
		Commands::Plan { file, log_dir } => handle_plan(&file, &cli.unit_dirs, &log_dir),
	}
}

fn handle_init(force: bool) -> Result<ExitCode> {
	let process_path = PathBuf::from(PROCESS_FILE);

	if process_path.exists() && !force {
		anyhow::bail!("{PROCESS_FILE} already exists. Use --force to overwrite.");
	}

	std::fs::write(&process_path, generate_init_template())
		.with_context(|| format!("Failed to write {}", process_path.display()))?;

	println!("Created {PROCESS_FILE}");
	Ok(ExitCode::SUCCESS)
}

fn load(file: &Path, unit_dirs: &[PathBuf]) -> Result<Process> {
	load_process(file, unit_dirs).with_context(|| format!("Failed to assemble {}", file.display()))
}

fn handle_validate(file: &Path, unit_dirs: &[PathBuf]) -> Result<ExitCode> {
	match load_process(file, unit_dirs) {
		Ok(process) => {
			println!(
				"Process {} is valid: {} modules, {} services, {} paths",
				process.name(),
				process.components().len(),
				process.services().len(),
				process.paths().len()
			);
			for (unit, origin) in process.units() {
				println!("  loaded {} ({})", unit, origin);
			}
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {:?}", anyhow::Error::from(e));
			Ok(ExitCode::FAILURE)
		}
	}
}

fn handle_dump(file: &Path, unit_dirs: &[PathBuf], flat: bool) -> Result<ExitCode> {
	let process = load(file, unit_dirs)?;

	if flat {
		for (path, value) in process.leaf_paths() {
			println!("{} = {}", path, value);
		}
	} else {
		print!("{}", process);
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_units(unit_dirs: &[PathBuf]) -> Result<ExitCode> {
	let cwd = std::env::current_dir().context("Failed to get current directory")?;
	let catalog = Catalog::with_search_path(unit_search_path(unit_dirs, &[], &cwd));

	println!("Built-in units:\n");
	for unit in catalog.builtins() {
		println!("  {} ({})", unit.name, unit.short_name());
		println!("      {}", unit.summary);
	}

	let files = catalog.file_units();
	if files.is_empty() {
		println!("\nNo unit files found on the search path.");
	} else {
		println!("\nUnit files (in search order):\n");
		for (name, dir) in &files {
			println!("  {}    # {}", name, dir.display());
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn handle_plan(file: &Path, unit_dirs: &[PathBuf], log_dir: &Path) -> Result<ExitCode> {
	let process = load(file, unit_dirs)?;
	let plan = ExecutionPlan::new(&process).context("Failed to plan the run")?;

	println!(
		"Process {}: {} event(s), {} scheduled module(s)",
		process.name(),
		plan.event_count(),
		plan.steps().len()
	);
	for step in plan.steps() {
		println!("  {} = {} (path {})", step.label, step.plugin, step.path);
	}
	let enabled = plan.fpe_guard().config().enabled();
	if !enabled.is_empty() {
		let names: Vec<String> = enabled.iter().map(ToString::to_string).collect();
		println!("  floating-point traps: {}", names.join(", "));
	}

	match process.message_logger() {
		Some(logger) => {
			std::fs::create_dir_all(log_dir)
				.with_context(|| format!("Failed to create {}", log_dir.display()))?;
			let subscriber = logger
				.subscriber(log_dir)
				.context("Failed to open MessageLogger destinations")?;
			tracing::subscriber::with_default(subscriber, || plan.dispatch(print_event));
		}
		None => {
			plan.dispatch(print_event);
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn print_event(id: &EventId, step: &ScheduledStep<'_>) {
	println!("event {} -> {}", id, step.label);
}
