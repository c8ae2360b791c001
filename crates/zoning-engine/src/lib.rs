//! # zoning-engine: Request Pipeline
//!
//! Wires the Parcel Locator, Overlay Resolver, Rule Engine and
//! Determination Builder into one request path over a shared,
//! versioned Layer Store.
//!
//! - [`config`]: layered [`EngineConfig`] (YAML, `ZONING_*`, flags).
//! - [`bootstrap`]: load-time phases. A bad ruleset stops here.
//! - [`engine`]: [`ZoningEngine`] with single and batch resolution and
//!   snapshot refresh.
//! - [`error`]: [`ResolveError`], the per-request failure taxonomy.

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;

pub use bootstrap::{bootstrap, load_ruleset, load_snapshot, BootstrapError};
pub use config::{
    AsOfPolicy, ConfigError, ConfigOverrides, EngineConfig, DEFAULT_BATCH_CONCURRENCY,
    DEFAULT_SNAPSHOT_RETENTION,
};
pub use engine::{BatchItem, ResolutionRequest, ZoningEngine};
pub use error::{RefreshError, ResolveError};
