//! # Layers Subcommand
//!
//! Per-kind overview of the configured layer feed: record counts and
//! sources, and which kinds have no data at all (those make every
//! determination partial).

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::Args;

use zoning_engine::{load_snapshot, EngineConfig};
use zoning_layers::SnapshotSummary;
use zoning_schema::SchemaValidator;

use crate::{to_json, EXIT_OK};

/// Arguments for `zoning layers`.
#[derive(Args, Debug)]
pub struct LayersArgs {
    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Plain-text rendering of a snapshot summary.
pub fn render(summary: &SnapshotSummary) -> String {
    let mut out = format!("snapshot {}", summary.snapshot_version);
    if let Some(description) = &summary.description {
        let _ = write!(out, " ({description})");
    }
    out.push('\n');
    for (kind, entry) in &summary.kinds {
        let _ = match entry {
            Some(k) => {
                let sources: Vec<&str> = k.sources.iter().map(|s| s.as_str()).collect();
                writeln!(out, "  {:<18} {:>5} layers  {}", kind.to_string(), k.layers, sources.join(", "))
            }
            None => writeln!(out, "  {:<18} unavailable", kind.to_string()),
        };
    }
    out
}

/// Execute the layers subcommand.
pub fn run_layers(args: &LayersArgs, config: &EngineConfig) -> Result<u8> {
    let validator = SchemaValidator::new().context("failed to compile embedded schemas")?;
    let snapshot = load_snapshot(&config.layer_feed, &validator)?;
    let summary = snapshot.summary();
    if args.json {
        println!("{}", to_json(&summary, false)?);
    } else {
        print!("{}", render(&summary));
    }
    Ok(EXIT_OK)
}
