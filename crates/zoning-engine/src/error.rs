//! Request-level errors.
//!
//! [`ResolveError`] folds every component error into the request
//! taxonomy. Locator and store failures abort the one request; per-field
//! data gaps never reach this type, they come back as a partial
//! determination.

use thiserror::Error;

use zoning_core::{Apn, SnapshotVersion};
use zoning_determination::BuildError;
use zoning_layers::LayerStoreError;
use zoning_locator::{IndexError, LocateError};
use zoning_resolver::ResolverError;
use zoning_rules::RuleEngineError;

/// Why a single resolution failed.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The input is neither an APN nor a usable address.
    #[error("invalid parcel identity {input:?}: {reason}")]
    InvalidInput { input: String, reason: String },

    /// No parcel matches the input.
    #[error("no parcel found for {query}")]
    NotFound { query: String },

    /// Several parcels match. The caller must disambiguate.
    #[error("{query} is ambiguous ({} candidates)", candidates.len())]
    AmbiguousInput { query: String, candidates: Vec<Apn> },

    /// The pinned snapshot is no longer retained.
    #[error("layer snapshot {version} is not retained")]
    SnapshotNotRetained { version: SnapshotVersion },

    /// The parcel index could not be reached or returned bad data.
    #[error("parcel index failure: {0}")]
    ParcelIndex(#[from] IndexError),

    /// Layer data could not be read.
    #[error("layer store failure: {0}")]
    LayerUnavailable(#[source] ResolverError),

    /// A built determination failed its provenance check.
    #[error("incomplete provenance for {field}: {detail}")]
    IncompleteProvenance { field: String, detail: String },

    /// Any other broken internal invariant.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl ResolveError {
    /// Whether this is a problem with the caller's input rather than with
    /// the engine. The CLI maps these to exit code 2.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::NotFound { .. }
                | Self::AmbiguousInput { .. }
                | Self::SnapshotNotRetained { .. }
        )
    }

    /// Short machine label, used for the outcome metric and batch output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::AmbiguousInput { .. } => "ambiguous_input",
            Self::SnapshotNotRetained { .. } => "snapshot_not_retained",
            Self::ParcelIndex(_) => "parcel_index_unavailable",
            Self::LayerUnavailable(_) => "layer_unavailable",
            Self::IncompleteProvenance { .. } | Self::Internal { .. } => "internal",
        }
    }

    /// Message safe to show an end user.
    ///
    /// Internal invariant violations collapse to a generic failure; the
    /// detail only goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::AmbiguousInput { query, candidates } => {
                let apns: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                format!(
                    "{query} matches {} parcels; specify one of: {}",
                    candidates.len(),
                    apns.join(", ")
                )
            }
            Self::IncompleteProvenance { .. } | Self::Internal { .. } => {
                "the determination could not be produced; the failure has been logged".to_string()
            }
            Self::ParcelIndex(_) => "the parcel index is unavailable".to_string(),
            Self::LayerUnavailable(_) => "regulatory layer data is unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<LocateError> for ResolveError {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::InvalidInput { input, reason } => Self::InvalidInput { input, reason },
            LocateError::NotFound { query } => Self::NotFound { query },
            LocateError::AmbiguousInput { query, candidates } => {
                Self::AmbiguousInput { query, candidates }
            }
            LocateError::Index(e) => Self::ParcelIndex(e),
        }
    }
}

impl From<LayerStoreError> for ResolveError {
    fn from(e: LayerStoreError) -> Self {
        match e {
            LayerStoreError::SnapshotNotRetained { version } => Self::SnapshotNotRetained { version },
            other => Self::LayerUnavailable(ResolverError::Store(other)),
        }
    }
}

impl From<ResolverError> for ResolveError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::Store(inner) => inner.into(),
            other => Self::LayerUnavailable(other),
        }
    }
}

impl From<RuleEngineError> for ResolveError {
    fn from(e: RuleEngineError) -> Self {
        Self::Internal {
            detail: e.to_string(),
        }
    }
}

impl From<BuildError> for ResolveError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::IncompleteProvenance { field, detail } => {
                Self::IncompleteProvenance { field, detail }
            }
            other => Self::Internal {
                detail: other.to_string(),
            },
        }
    }
}

/// Refresh failures.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The engine was built without a feed source.
    #[error("no layer feed source is configured")]
    NoFeedSource,

    /// Fetch, decode or install failed. The current snapshot is unchanged.
    #[error(transparent)]
    Store(#[from] LayerStoreError),
}
