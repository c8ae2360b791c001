//! # Error Types
//!
//! Leaf error types for the primitives in this crate. Higher crates wrap
//! these in their own enums with `#[from]`.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Heights, FAR and distances must go through `Quantity`.
    #[error("float values are not permitted in canonical representations; use Quantity or an integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// An identifier failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} {value:?}: {reason}")]
pub struct IdentifierError {
    /// Identifier namespace (e.g. "apn", "source id").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

impl IdentifierError {
    pub(crate) fn new(kind: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Geometry failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate {
        /// X (easting) component.
        x: f64,
        /// Y (northing) component.
        y: f64,
    },

    /// A polygon ring is not closed or has too few positions.
    #[error("ring {ring} is invalid: {reason}")]
    InvalidRing {
        /// Ring index (0 = exterior).
        ring: usize,
        /// Description of the defect.
        reason: String,
    },

    /// A polygon has zero area.
    #[error("polygon has zero area")]
    ZeroArea,

    /// A multi-polygon has no members.
    #[error("multi_polygon has no polygons")]
    EmptyMultiPolygon,
}

/// A fixed-point quantity could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid quantity {input:?}: {reason}")]
pub struct QuantityError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

/// An effective-date range is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// `effective_until` is not after `effective_from`.
    #[error("effective range is empty: from {from} until {until}")]
    EmptyRange {
        /// Start date (inclusive).
        from: chrono::NaiveDate,
        /// End date (exclusive).
        until: chrono::NaiveDate,
    },
}
