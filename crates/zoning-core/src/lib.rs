//! # zoning-core: Foundational Types for the Zoning Resolution Engine
//!
//! Every other crate in the workspace depends on `zoning-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `Apn`, `SourceId`, `LayerId`,
//!    `RuleId`, `SnapshotVersion`, `RulesetVersion`, `Jurisdiction`. All
//!    have validated constructors. No bare strings cross crate boundaries.
//!
//! 2. **`CanonicalBytes` newtype.** Every digest in the engine (ruleset
//!    digest, geometry digest, determination id) flows through
//!    `CanonicalBytes::new()`. Floats are rejected, so numeric values that
//!    reach a determination are integers or fixed-point [`Quantity`] strings.
//!
//! 3. **Single `LayerKind` enum.** Exhaustive `match` everywhere: adding a
//!    kind forces the store, resolver and rule engine to handle it.
//!
//! 4. **Planar geometry.** Coordinates are feet in a projected CRS. Spatial
//!    predicates live on [`Geometry`] so the store and resolver agree on
//!    what "intersects" means.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zoning-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod layer_kind;
pub mod quantity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{
    CanonicalizationError, GeometryError, IdentifierError, QuantityError, TemporalError,
};
pub use geometry::{Geometry, GeometryFingerprint, Shape, SpatialRelation};
pub use identity::{Apn, Jurisdiction, LayerId, RuleId, RulesetVersion, SnapshotVersion, SourceId};
pub use layer_kind::{LayerKind, UnknownLayerKind, LAYER_KIND_COUNT};
pub use quantity::{Quantity, RelevanceWeight};
pub use temporal::{today_utc, EffectiveRange};
