//! # zoning-resolver: Overlay Resolver
//!
//! Given a located parcel and a layer snapshot, produces the ordered set of
//! [`Match`]es the Rule Engine works from.
//!
//! Ordering is two-level: spatial predicate class first (containment, then
//! overlap, then buffer adjacency), then source rank configured per layer
//! kind, then weight, then ids. The same parcel geometry and snapshot
//! always yield the same match set in the same order.

pub mod error;
pub mod matching;
pub mod policy;
pub mod resolver;

pub use error::ResolverError;
pub use matching::{IntersectionKind, Match, MatchRecord, MatchSet};
pub use policy::ResolutionPolicy;
pub use resolver::OverlayResolver;
