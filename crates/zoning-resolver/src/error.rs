//! Overlay Resolver errors.

use thiserror::Error;

use zoning_core::CanonicalizationError;
use zoning_layers::LayerStoreError;

/// Errors from [`OverlayResolver::resolve`](crate::OverlayResolver::resolve).
///
/// `LayerUnavailable` is not among them: an unloaded kind is recorded on
/// the [`MatchSet`](crate::MatchSet) and resolution continues.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The layer store failed for a reason other than an unloaded kind.
    #[error(transparent)]
    Store(#[from] LayerStoreError),

    /// A layer geometry could not be digested.
    #[error("failed to digest geometry of layer {layer_id}: {source}")]
    Digest {
        /// Offending layer.
        layer_id: String,
        /// Underlying error.
        source: CanonicalizationError,
    },
}
