//! # Engine Bootstrap
//!
//! Builds a serving [`ZoningEngine`] from an [`EngineConfig`].
//!
//! ## Bootstrap Sequence
//!
//! 1. **Compile schemas**: the embedded feed and ruleset JSON Schemas.
//! 2. **Load ruleset**: schema check, then load-time validation. Any
//!    `RuleConfigError` stops here and the engine never serves.
//! 3. **Load layers**: read the ETL feed and install the first snapshot.
//! 4. **Load parcel index**.
//! 5. **Log engine identity**: structured startup banner.

use std::path::Path;
use std::sync::Arc;

use zoning_layers::{FeedError, FileFeedSource, LayerFeed, LayerSnapshot, LayerStore};
use zoning_locator::{IndexError, InMemoryParcelIndex};
use zoning_rules::{Ruleset, RulesetError};
use zoning_schema::{SchemaValidationError, SchemaValidator};

use crate::config::EngineConfig;
use crate::engine::ZoningEngine;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors during engine bootstrap. Every one of them is fatal.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The embedded schemas failed to compile.
    #[error("schema setup failed: {0}")]
    Schema(#[from] SchemaValidationError),

    /// The ruleset is unreadable or invalid.
    #[error("ruleset {path}: {source}")]
    Ruleset { path: String, source: RulesetError },

    /// The initial layer feed is unreadable or invalid.
    #[error("layer feed {path}: {source}")]
    Feed { path: String, source: FeedError },

    /// The parcel index is unreadable or invalid.
    #[error("parcel index {path}: {source}")]
    ParcelIndex { path: String, source: IndexError },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run every bootstrap phase and assemble the engine.
pub fn bootstrap(config: &EngineConfig) -> Result<ZoningEngine, BootstrapError> {
    tracing::debug!(?config, "bootstrapping zoning engine");

    // Phase 1
    let validator = Arc::new(SchemaValidator::new()?);

    // Phase 2
    let ruleset = Arc::new(load_ruleset(&config.ruleset, &validator)?);

    // Phase 3
    let snapshot = load_snapshot(&config.layer_feed, &validator)?;
    let store = Arc::new(LayerStore::new(snapshot, config.snapshot_retention));

    // Phase 4
    let index = load_parcel_index(&config.parcel_index)?;
    let parcels = index.len();

    let engine = ZoningEngine::new(ruleset, store, Arc::new(index))
        .with_feed_source(Arc::new(FileFeedSource::new(
            config.layer_feed.clone(),
            validator,
        )))
        .with_batch_concurrency(config.batch_concurrency)
        .with_default_as_of(config.default_as_of);

    // Phase 5
    log_engine_banner(&engine, config, parcels);
    Ok(engine)
}

/// Load and validate a ruleset without building an engine.
pub fn load_ruleset(path: &Path, validator: &SchemaValidator) -> Result<Ruleset, BootstrapError> {
    let ruleset = Ruleset::load(path, validator).map_err(|source| BootstrapError::Ruleset {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        version = %ruleset.version(),
        digest = %ruleset.digest(),
        rules = ruleset.rules().len(),
        "ruleset loaded"
    );
    Ok(ruleset)
}

// ---------------------------------------------------------------------------
// Phase 3: Layers
// ---------------------------------------------------------------------------

/// Load a feed and build its snapshot without installing it.
pub fn load_snapshot(
    path: &Path,
    validator: &SchemaValidator,
) -> Result<LayerSnapshot, BootstrapError> {
    let feed_error = |source| BootstrapError::Feed {
        path: path.display().to_string(),
        source,
    };
    let feed = LayerFeed::load(path, validator).map_err(feed_error)?;
    let snapshot = LayerSnapshot::from_feed(feed).map_err(feed_error)?;

    let missing: Vec<String> = zoning_core::LayerKind::all()
        .iter()
        .filter(|kind| !snapshot.is_loaded(**kind))
        .map(ToString::to_string)
        .collect();
    if missing.is_empty() {
        tracing::info!(
            path = %path.display(),
            snapshot = %snapshot.version(),
            layers = snapshot.layer_count(),
            "layer snapshot loaded"
        );
    } else {
        tracing::warn!(
            path = %path.display(),
            snapshot = %snapshot.version(),
            layers = snapshot.layer_count(),
            missing = %missing.join(","),
            "layer snapshot loaded without some kinds; determinations will be partial"
        );
    }
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Phase 4: Parcel index
// ---------------------------------------------------------------------------

fn load_parcel_index(path: &Path) -> Result<InMemoryParcelIndex, BootstrapError> {
    let index = InMemoryParcelIndex::load(path).map_err(|source| BootstrapError::ParcelIndex {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), parcels = index.len(), "parcel index loaded");
    Ok(index)
}

// ---------------------------------------------------------------------------
// Phase 5: Banner
// ---------------------------------------------------------------------------

fn log_engine_banner(engine: &ZoningEngine, config: &EngineConfig, parcels: usize) {
    let snapshot = engine.store().current();
    tracing::info!(
        ruleset_version = %engine.ruleset().version(),
        ruleset_digest = %engine.ruleset().digest(),
        snapshot = %snapshot.version(),
        layers = snapshot.layer_count(),
        parcels,
        snapshot_retention = config.snapshot_retention,
        batch_concurrency = config.batch_concurrency,
        default_as_of = %config.default_as_of,
        "zoning engine ready"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
