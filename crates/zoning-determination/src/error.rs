//! Determination Builder errors.

use thiserror::Error;

use zoning_core::CanonicalizationError;

/// Errors from [`build`](crate::build).
///
/// Both variants are internal-consistency failures. They are logged with
/// full detail and surfaced to end users as a generic failure.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A reported field or overlay cannot be traced to a match or rule.
    #[error("incomplete provenance for {field}: {detail}")]
    IncompleteProvenance {
        /// Field (or `overlays[rank]`) that failed.
        field: String,
        /// What was missing.
        detail: String,
    },

    /// The determination body could not be canonicalized.
    #[error("determination digest failed: {0}")]
    Digest(#[from] CanonicalizationError),
}
