//! # Versioned Layer Store
//!
//! Holds the current [`LayerSnapshot`] plus a small arena of recently
//! replaced snapshots. Readers clone an `Arc` under a short read lock and
//! then work lock-free; refresh builds the next snapshot without holding
//! any lock and swaps it in under a brief write lock.
//!
//! The lock is `parking_lot::RwLock` and is never held across `.await`.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use zoning_core::SnapshotVersion;

use crate::error::{LayerStoreError, LayerStoreResult};
use crate::feed::LayerFeedSource;
use crate::snapshot::LayerSnapshot;

/// Default number of snapshots retained for pinned reads.
pub const DEFAULT_RETENTION: usize = 4;

struct SnapshotArena {
    current: Arc<LayerSnapshot>,
    /// Replaced snapshots still servable by version, oldest first.
    previous: VecDeque<Arc<LayerSnapshot>>,
}

impl SnapshotArena {
    fn iter(&self) -> impl Iterator<Item = &Arc<LayerSnapshot>> {
        self.previous.iter().chain(std::iter::once(&self.current))
    }
}

/// Shared, atomically refreshed regulatory layer store.
pub struct LayerStore {
    arena: RwLock<SnapshotArena>,
    retention: usize,
}

impl std::fmt::Debug for LayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStore")
            .field("current", &self.current().version().as_str())
            .field("retained", &self.retained_versions())
            .field("retention", &self.retention)
            .finish()
    }
}

impl LayerStore {
    /// Create a store serving `initial`, retaining up to `retention`
    /// snapshots (at least one).
    pub fn new(initial: LayerSnapshot, retention: usize) -> Self {
        Self {
            arena: RwLock::new(SnapshotArena {
                current: Arc::new(initial),
                previous: VecDeque::new(),
            }),
            retention: retention.max(1),
        }
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<LayerSnapshot> {
        Arc::clone(&self.arena.read().current)
    }

    /// A retained snapshot by version.
    pub fn pinned(&self, version: &SnapshotVersion) -> LayerStoreResult<Arc<LayerSnapshot>> {
        self.arena
            .read()
            .iter()
            .find(|s| s.version() == version)
            .cloned()
            .ok_or_else(|| LayerStoreError::SnapshotNotRetained {
                version: version.clone(),
            })
    }

    /// Retained versions, oldest first.
    pub fn retained_versions(&self) -> Vec<SnapshotVersion> {
        self.arena
            .read()
            .iter()
            .map(|s| s.version().clone())
            .collect()
    }

    /// Make `snapshot` current. Requests already holding the previous
    /// snapshot keep it; new requests see the new one.
    pub fn install(&self, snapshot: LayerSnapshot) -> LayerStoreResult<Arc<LayerSnapshot>> {
        let snapshot = Arc::new(snapshot);
        let evicted = {
            let mut arena = self.arena.write();
            if arena.iter().any(|s| s.version() == snapshot.version()) {
                return Err(LayerStoreError::VersionAlreadyInstalled {
                    version: snapshot.version().clone(),
                });
            }
            let replaced = std::mem::replace(&mut arena.current, Arc::clone(&snapshot));
            arena.previous.push_back(replaced);
            let mut evicted = Vec::new();
            while arena.previous.len() + 1 > self.retention {
                match arena.previous.pop_front() {
                    Some(old) => evicted.push(old.version().clone()),
                    None => break,
                }
            }
            evicted
        };

        tracing::info!(
            snapshot = %snapshot.version(),
            layers = snapshot.layer_count(),
            evicted = ?evicted,
            "layer snapshot installed"
        );
        Ok(snapshot)
    }

    /// Fetch a feed from `source`, build a snapshot and install it.
    ///
    /// The fetch is the only await point. A failed refresh leaves the
    /// current snapshot in place.
    pub async fn refresh(
        &self,
        source: &dyn LayerFeedSource,
    ) -> LayerStoreResult<Arc<LayerSnapshot>> {
        let origin = source.describe();
        tracing::debug!(source = %origin, "fetching layer feed");

        let result = async {
            let feed = source.fetch().await?;
            let snapshot = LayerSnapshot::from_feed(feed)?;
            self.install(snapshot)
        }
        .await;

        let outcome = match &result {
            Ok(_) => "installed",
            Err(LayerStoreError::VersionAlreadyInstalled { .. }) => "unchanged",
            Err(_) => "failed",
        };
        metrics::counter!("zoning_layer_refresh_total", "outcome" => outcome).increment(1);
        if let Err(e) = &result {
            tracing::warn!(source = %origin, error = %e, "layer refresh did not install a snapshot");
        }
        result
    }
}
