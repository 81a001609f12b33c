//! # courtlist CLI entry point
//!
//! Parses command-line arguments, installs logging, loads configuration and
//! the rule registry, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use courtlist_cli::ingest::{run_ingest, IngestArgs};
use courtlist_cli::rules::{run_rules, RulesArgs};
use courtlist_cli::validate::{run_validate, ValidateArgs};
use courtlist_cli::{load_config, load_registry, EXIT_OPERATIONAL};

/// Court list publication engine.
///
/// Validates court and tribunal list bodies against per-list-type rule sets
/// and runs accepted bodies through artefact supersession.
#[derive(Parser, Debug)]
#[command(name = "courtlist", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered list types and their rules.
    Rules(RulesArgs),

    /// Validate bodies against a list type without ingesting them.
    Validate(ValidateArgs),

    /// Validate and ingest bodies in order, showing supersession.
    Ingest(IngestArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "courtlist CLI starting");

    let result = load_config(cli.config.as_deref()).and_then(|config| {
        let registry = load_registry(&config)?;
        match cli.command {
            Commands::Rules(args) => run_rules(&args, &registry),
            Commands::Validate(args) => run_validate(&args, &registry),
            Commands::Ingest(args) => run_ingest(&args, &config, registry),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_OPERATIONAL)
        }
    }
}
