//! # Batch Subcommand
//!
//! Resolves every parcel listed in a file, one APN or address per line.
//! Blank lines and lines starting with `#` are ignored. Output is a JSON
//! array of `{input, determination | error}` in input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;

use zoning_engine::{BatchItem, ConfigOverrides, ResolutionRequest, ZoningEngine};

use crate::{to_json, EXIT_ERROR, EXIT_OK, EXIT_RESOLUTION};

/// Arguments for `zoning batch`.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File with one APN or address per line.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Parallel resolutions. Overrides the configured batch concurrency.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Evaluation date for every item, YYYY-MM-DD.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Print single-line JSON.
    #[arg(long)]
    pub compact: bool,
}

impl BatchArgs {
    /// Config settings these arguments override.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            batch_concurrency: self.concurrency,
            ..Default::default()
        }
    }
}

/// Read batch inputs from `path`.
pub fn read_inputs(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Exit code for a finished batch.
///
/// Any engine-side failure wins over input problems; input problems
/// alone give [`EXIT_RESOLUTION`].
pub fn exit_code(items: &[BatchItem]) -> u8 {
    let mut code = EXIT_OK;
    for item in items {
        match &item.result {
            Ok(_) => {}
            Err(e) if e.is_resolution_error() => code = code.max(EXIT_RESOLUTION),
            Err(_) => return EXIT_ERROR,
        }
    }
    code
}

/// Execute the batch subcommand.
pub async fn run_batch(args: &BatchArgs, engine: Arc<ZoningEngine>) -> Result<u8> {
    let inputs = read_inputs(&args.file)?;
    tracing::info!(file = %args.file.display(), items = inputs.len(), "starting batch");

    let requests = inputs
        .into_iter()
        .map(|input| {
            let request = ResolutionRequest::new(input);
            match args.as_of {
                Some(date) => request.as_of(date),
                None => request,
            }
        })
        .collect();
    let items = engine.resolve_batch(requests).await;

    println!("{}", to_json(&items, args.compact)?);
    Ok(exit_code(&items))
}
