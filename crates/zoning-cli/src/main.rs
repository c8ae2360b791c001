//! # zoning CLI entry point
//!
//! Parses command-line arguments, installs logging and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use zoning_cli::batch::{run_batch, BatchArgs};
use zoning_cli::layers::{run_layers, LayersArgs};
use zoning_cli::resolve::{run_resolve, ResolveArgs};
use zoning_cli::validate::{run_validate, ValidateArgs};
use zoning_cli::{engine_config, start_engine, EXIT_ERROR};
use zoning_engine::ConfigOverrides;

/// LA County zoning resolution engine.
///
/// Resolves a parcel (APN or street address) to a provenance-carrying
/// zoning determination: base zone, overlays, and derived eligibilities.
#[derive(Parser, Debug)]
#[command(name = "zoning", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the engine configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve one parcel and print its determination.
    Resolve(ResolveArgs),

    /// Resolve every parcel listed in a file.
    Batch(BatchArgs),

    /// Check a ruleset and/or layer feed without serving.
    Validate(ValidateArgs),

    /// Summarize the configured layer feed per kind.
    Layers(LayersArgs),
}

fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "zoning CLI starting");

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Resolve(args) => match start_engine(config, ConfigOverrides::default()) {
            Ok(engine) => run_resolve(args, &engine).await,
            Err(e) => Err(e),
        },
        Commands::Batch(args) => match start_engine(config, args.overrides()) {
            Ok(engine) => run_batch(args, Arc::new(engine)).await,
            Err(e) => Err(e),
        },
        Commands::Validate(args) => run_validate(args, config),
        Commands::Layers(args) => match engine_config(config, ConfigOverrides::default()) {
            Ok(resolved) => run_layers(args, &resolved),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
