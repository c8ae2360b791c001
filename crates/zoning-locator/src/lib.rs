//! # zoning-locator: Parcel Locator
//!
//! Resolves an address or APN into one canonical [`Parcel`]: APN, normalized
//! situs address, geometry (polygon or centroid) and jurisdiction tag.
//!
//! The geocoding / parcel-index service is an external collaborator behind
//! the [`ParcelIndex`] trait. Its lookup is one of the two suspension
//! points in a resolution request.
//!
//! ## Failure Modes
//!
//! - `InvalidInput`: empty input, or an address without a house number.
//! - `NotFound`: no parcel matches.
//! - `AmbiguousInput`: several distinct parcels match. The caller must
//!   disambiguate; the locator never picks one.

pub mod address;
pub mod error;
pub mod index;
pub mod locator;
pub mod parcel;
pub mod query;

pub use address::{AddressProblem, NormalizedAddress};
pub use error::{IndexError, LocateError};
pub use index::{CountingParcelIndex, InMemoryParcelIndex, ParcelIndex};
pub use locator::ParcelLocator;
pub use parcel::{Parcel, ParcelRecord};
pub use query::ParcelQuery;
