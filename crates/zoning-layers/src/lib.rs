//! # zoning-layers: Layer Store
//!
//! Normalized, queryable regulatory layers (base zoning, overlays,
//! environmental constraints, transit proximity, hazards) keyed by spatial
//! identity.
//!
//! ## Snapshot Model
//!
//! The ETL feed delivers a complete dataset at a time. Each feed becomes an
//! immutable [`LayerSnapshot`]; refresh builds a new snapshot off to the side
//! and swaps an `Arc` in [`LayerStore`]. A request captures one snapshot
//! handle at its start, so it sees either the prior dataset or the new one
//! in its entirety. The store retains the last few snapshots so requests can
//! pin an explicit `snapshot_version` for reproducibility.
//!
//! ## Query Contract
//!
//! [`LayerSnapshot::layers_intersecting`] filters by effective date and
//! spatial proximity and returns layers ordered by `(kind, source_id,
//! layer_id)`. A kind with no loaded data fails with `LayerUnavailable`;
//! a loaded kind with no nearby layers is an empty result.

pub mod attribute;
pub mod error;
pub mod feed;
pub mod layer;
pub mod snapshot;
pub mod store;

pub use attribute::AttributeValue;
pub use error::{FeedError, LayerStoreError, LayerStoreResult};
pub use feed::{FileFeedSource, LayerFeed, LayerFeedSource, StaticFeedSource};
pub use layer::RegulatoryLayer;
pub use snapshot::{KindSummary, LayerSnapshot, SnapshotSummary};
pub use store::{LayerStore, DEFAULT_RETENTION};
