//! # zoning-cli: Operator CLI
//!
//! The `zoning` binary. An operator tool over the engine, not the
//! presentation layer.
//!
//! ## Subcommands
//!
//! - `zoning resolve <APN|ADDRESS>`: one determination as JSON.
//! - `zoning batch <FILE>`: one input per line, results in input order.
//! - `zoning validate`: check a ruleset and/or layer feed.
//! - `zoning layers`: per-kind counts of the configured layer feed.
//!
//! ```bash
//! zoning --config fixtures/zoning.yaml resolve 1234-005-006 --as-of 2024-01-01
//! zoning --config fixtures/zoning.yaml batch parcels.txt --concurrency 4
//! zoning validate --ruleset fixtures/ruleset.yaml --feed fixtures/layers.json
//! ```
//!
//! Exit codes: [`EXIT_OK`], [`EXIT_ERROR`], [`EXIT_RESOLUTION`].

pub mod batch;
pub mod layers;
pub mod resolve;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use zoning_engine::{ConfigOverrides, EngineConfig, ZoningEngine};

/// Success.
pub const EXIT_OK: u8 = 0;

/// Configuration, data or internal failure.
pub const EXIT_ERROR: u8 = 1;

/// The input did not identify exactly one parcel.
pub const EXIT_RESOLUTION: u8 = 2;

/// Assemble the engine configuration: file, environment, then `flags`.
pub fn engine_config(config: Option<&Path>, flags: ConfigOverrides) -> Result<EngineConfig> {
    let resolved = EngineConfig::load(config, flags).context("invalid engine configuration")?;
    tracing::debug!(config = ?resolved, "engine configuration resolved");
    Ok(resolved)
}

/// Configure and bootstrap an engine.
pub fn start_engine(config: Option<&Path>, flags: ConfigOverrides) -> Result<ZoningEngine> {
    let config = engine_config(config, flags)?;
    zoning_engine::bootstrap(&config).context("engine bootstrap failed")
}

/// Serialize `value` as pretty or compact JSON.
pub(crate) fn to_json<T: serde::Serialize + ?Sized>(value: &T, compact: bool) -> Result<String> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    text.context("failed to serialize output")
}
