//! Layer Store error types.

use thiserror::Error;

use zoning_core::{LayerId, LayerKind, SnapshotVersion};
use zoning_schema::{DocumentError, SchemaValidationError};

/// Errors turning an ETL feed into a snapshot.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed could not be read or parsed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The feed does not conform to the layer feed schema.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    /// The feed conforms structurally but a value is invalid
    /// (bad geometry, empty date range, malformed identifier).
    #[error("invalid layer feed {origin}: {source}")]
    Decode {
        /// Feed origin label.
        origin: String,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Two layers share an id.
    #[error("duplicate layer id {layer_id} in feed")]
    DuplicateLayer {
        /// The repeated id.
        layer_id: LayerId,
    },

    /// Two attribute names on one layer collide after case folding.
    #[error("layer {layer_id} has attribute {attribute:?} more than once (names are case-insensitive)")]
    DuplicateAttribute {
        /// Offending layer.
        layer_id: LayerId,
        /// Case-folded attribute name.
        attribute: String,
    },

    /// A remote feed source could not deliver.
    #[error("layer feed source {source_name} unavailable: {reason}")]
    SourceUnavailable {
        /// Source description.
        source_name: String,
        /// Failure detail.
        reason: String,
    },
}

/// Errors from Layer Store queries and snapshot management.
#[derive(Error, Debug)]
pub enum LayerStoreError {
    /// The snapshot holds no data at all for this kind.
    #[error("no {kind} layers are loaded in snapshot {snapshot}")]
    LayerUnavailable {
        /// Requested kind.
        kind: LayerKind,
        /// Snapshot queried.
        snapshot: SnapshotVersion,
    },

    /// A pinned snapshot version has been evicted or never existed.
    #[error("layer snapshot {version} is not retained")]
    SnapshotNotRetained {
        /// Requested version.
        version: SnapshotVersion,
    },

    /// Refresh delivered a version the store already holds.
    #[error("layer snapshot {version} is already installed")]
    VersionAlreadyInstalled {
        /// Repeated version.
        version: SnapshotVersion,
    },

    /// Refresh failed before a snapshot could be built.
    #[error("layer refresh failed: {0}")]
    Feed(#[from] FeedError),
}

/// Result alias for store operations.
pub type LayerStoreResult<T> = Result<T, LayerStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_unavailable_names_kind_and_snapshot() {
        let err = LayerStoreError::LayerUnavailable {
            kind: LayerKind::Environmental,
            snapshot: SnapshotVersion::new("2024-01-15.1").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "no environmental layers are loaded in snapshot 2024-01-15.1"
        );
    }

    #[test]
    fn duplicate_layer_display() {
        let err = FeedError::DuplicateLayer {
            layer_id: LayerId::new("znet-1").unwrap(),
        };
        assert!(err.to_string().contains("znet-1"));
    }
}
