//! # Layer Snapshots
//!
//! An immutable, versioned view of every loaded regulatory layer. Built
//! once from a feed and never mutated; refresh produces a new snapshot.
//!
//! Layers are bucketed by kind and sorted by `(source_id, layer_id)` at
//! build time, so every query walks them in a fixed order regardless of the
//! feed's record order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use zoning_core::{Geometry, LayerId, LayerKind, SnapshotVersion, SourceId};

use crate::attribute::AttributeValue;
use crate::error::{FeedError, LayerStoreError, LayerStoreResult};
use crate::feed::LayerFeed;
use crate::layer::RegulatoryLayer;

/// Immutable set of regulatory layers.
#[derive(Debug, Clone)]
pub struct LayerSnapshot {
    version: SnapshotVersion,
    description: Option<String>,
    by_kind: BTreeMap<LayerKind, Vec<Arc<RegulatoryLayer>>>,
}

impl LayerSnapshot {
    /// Build a snapshot from a parsed feed.
    ///
    /// A kind counts as loaded when the feed lists it in `coverage` or
    /// carries at least one record of it. Attribute names are case-folded.
    pub fn from_feed(feed: LayerFeed) -> Result<Self, FeedError> {
        let mut by_kind: BTreeMap<LayerKind, Vec<Arc<RegulatoryLayer>>> = BTreeMap::new();
        for kind in &feed.coverage {
            by_kind.entry(*kind).or_default();
        }

        let mut seen: BTreeSet<LayerId> = BTreeSet::new();
        for mut layer in feed.layers {
            if !seen.insert(layer.layer_id.clone()) {
                return Err(FeedError::DuplicateLayer {
                    layer_id: layer.layer_id,
                });
            }
            layer.attributes = fold_attribute_names(&layer.layer_id, layer.attributes)?;
            by_kind.entry(layer.kind).or_default().push(Arc::new(layer));
        }

        for layers in by_kind.values_mut() {
            layers.sort_by(|a, b| {
                (&a.source_id, &a.layer_id).cmp(&(&b.source_id, &b.layer_id))
            });
        }

        Ok(Self {
            version: feed.snapshot_version,
            description: feed.description,
            by_kind,
        })
    }

    /// A snapshot with nothing loaded. Every kind is unavailable.
    pub fn empty(version: SnapshotVersion) -> Self {
        Self {
            version,
            description: None,
            by_kind: BTreeMap::new(),
        }
    }

    /// Snapshot version label.
    pub fn version(&self) -> &SnapshotVersion {
        &self.version
    }

    /// ETL description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True if the kind has loaded data (possibly zero records).
    pub fn is_loaded(&self, kind: LayerKind) -> bool {
        self.by_kind.contains_key(&kind)
    }

    /// Loaded kinds, in `LayerKind` order.
    pub fn loaded_kinds(&self) -> impl Iterator<Item = LayerKind> + '_ {
        self.by_kind.keys().copied()
    }

    /// Total number of layer records.
    pub fn layer_count(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    /// All layers of a kind, in snapshot order.
    pub fn layers(&self, kind: LayerKind) -> LayerStoreResult<&[Arc<RegulatoryLayer>]> {
        self.by_kind
            .get(&kind)
            .map(Vec::as_slice)
            .ok_or_else(|| LayerStoreError::LayerUnavailable {
                kind,
                snapshot: self.version.clone(),
            })
    }

    /// Layers of `kind` in force on `as_of` that lie within `buffer_ft`
    /// of `geometry` (zero buffer means touching or intersecting).
    ///
    /// Ordered by `(source_id, layer_id)`. Fails with `LayerUnavailable`
    /// when the kind has no loaded data; zero matches is `Ok(vec![])`.
    pub fn layers_intersecting(
        &self,
        geometry: &Geometry,
        as_of: NaiveDate,
        kind: LayerKind,
        buffer_ft: f64,
    ) -> LayerStoreResult<Vec<Arc<RegulatoryLayer>>> {
        let layers = self.layers(kind)?;
        Ok(layers
            .iter()
            .filter(|layer| layer.is_effective(as_of))
            .filter(|layer| geometry.may_be_within(&layer.geometry, buffer_ft))
            .filter(|layer| geometry.within_distance(&layer.geometry, buffer_ft))
            .cloned()
            .collect())
    }

    /// Per-kind counts for operator tooling.
    pub fn summary(&self) -> SnapshotSummary {
        let kinds = LayerKind::all()
            .iter()
            .map(|kind| {
                let summary = self.by_kind.get(kind).map(|layers| {
                    let sources: BTreeSet<&SourceId> =
                        layers.iter().map(|l| &l.source_id).collect();
                    KindSummary {
                        layers: layers.len(),
                        sources: sources.into_iter().cloned().collect(),
                    }
                });
                (*kind, summary)
            })
            .collect();
        SnapshotSummary {
            snapshot_version: self.version.clone(),
            description: self.description.clone(),
            kinds,
        }
    }
}

fn fold_attribute_names(
    layer_id: &LayerId,
    attributes: BTreeMap<String, AttributeValue>,
) -> Result<BTreeMap<String, AttributeValue>, FeedError> {
    let mut folded = BTreeMap::new();
    for (name, value) in attributes {
        let key = name.to_ascii_lowercase();
        if folded.insert(key.clone(), value).is_some() {
            return Err(FeedError::DuplicateAttribute {
                layer_id: layer_id.clone(),
                attribute: key,
            });
        }
    }
    Ok(folded)
}

/// Loaded-data overview of one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    /// Snapshot version.
    pub snapshot_version: SnapshotVersion,
    /// ETL description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every kind; `None` for kinds with no loaded data.
    pub kinds: BTreeMap<LayerKind, Option<KindSummary>>,
}

/// Loaded-data overview of one kind.
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    /// Record count.
    pub layers: usize,
    /// Distinct sources, sorted.
    pub sources: Vec<SourceId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoning_core::EffectiveRange;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn layer(id: &str, kind: LayerKind, source: &str, geometry: Geometry) -> RegulatoryLayer {
        RegulatoryLayer {
            layer_id: LayerId::new(id).unwrap(),
            kind,
            source_id: SourceId::new(source).unwrap(),
            designation: id.to_uppercase(),
            geometry,
            attributes: BTreeMap::new(),
            effective: EffectiveRange::since(d("2020-01-01")),
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Geometry {
        Geometry::rect(x, y, x + size, y + size).unwrap()
    }

    fn feed(layers: Vec<RegulatoryLayer>, coverage: Vec<LayerKind>) -> LayerFeed {
        LayerFeed {
            snapshot_version: SnapshotVersion::new("snap-1").unwrap(),
            description: None,
            coverage,
            layers,
        }
    }

    #[test]
    fn results_are_ordered_by_source_then_layer_regardless_of_feed_order() {
        let parcel = square(10.0, 10.0, 10.0);
        let layers = vec![
            layer("zb", LayerKind::BaseZone, "zimas", square(0.0, 0.0, 100.0)),
            layer("za", LayerKind::BaseZone, "znet", square(0.0, 0.0, 100.0)),
            layer("zc", LayerKind::BaseZone, "znet", square(0.0, 0.0, 50.0)),
        ];
        let mut reversed = layers.clone();
        reversed.reverse();

        for input in [layers, reversed] {
            let snap = LayerSnapshot::from_feed(feed(input, vec![])).unwrap();
            let ids: Vec<String> = snap
                .layers_intersecting(&parcel, d("2024-01-01"), LayerKind::BaseZone, 0.0)
                .unwrap()
                .iter()
                .map(|l| l.layer_id.to_string())
                .collect();
            assert_eq!(ids, vec!["zb", "za", "zc"]);
        }
    }

    #[test]
    fn unloaded_kind_is_unavailable_but_covered_empty_kind_is_not() {
        let snap = LayerSnapshot::from_feed(feed(
            vec![layer("z", LayerKind::BaseZone, "znet", square(0.0, 0.0, 10.0))],
            vec![LayerKind::HazardZone],
        ))
        .unwrap();
        let parcel = square(0.0, 0.0, 5.0);

        let err = snap
            .layers_intersecting(&parcel, d("2024-01-01"), LayerKind::Environmental, 0.0)
            .unwrap_err();
        assert!(matches!(
            err,
            LayerStoreError::LayerUnavailable { kind: LayerKind::Environmental, .. }
        ));

        let hazards = snap
            .layers_intersecting(&parcel, d("2024-01-01"), LayerKind::HazardZone, 0.0)
            .unwrap();
        assert!(hazards.is_empty());
    }

    #[test]
    fn effective_dates_filter_layers() {
        let mut old = layer("old", LayerKind::Overlay, "zimas", square(0.0, 0.0, 100.0));
        old.effective = EffectiveRange::new(d("2010-01-01"), Some(d("2020-01-01"))).unwrap();
        let snap = LayerSnapshot::from_feed(feed(vec![old], vec![])).unwrap();
        let parcel = square(10.0, 10.0, 5.0);

        assert!(snap
            .layers_intersecting(&parcel, d("2024-01-01"), LayerKind::Overlay, 0.0)
            .unwrap()
            .is_empty());
        assert_eq!(
            snap.layers_intersecting(&parcel, d("2015-06-01"), LayerKind::Overlay, 0.0)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn buffer_reaches_nearby_points() {
        let stop = layer(
            "stop-1",
            LayerKind::TransitProximity,
            "metro",
            Geometry::point(500.0, 0.0).unwrap(),
        );
        let snap = LayerSnapshot::from_feed(feed(vec![stop], vec![])).unwrap();
        let parcel = square(0.0, 0.0, 100.0);

        let near = snap
            .layers_intersecting(&parcel, d("2024-01-01"), LayerKind::TransitProximity, 2640.0)
            .unwrap();
        assert_eq!(near.len(), 1);
        let none = snap
            .layers_intersecting(&parcel, d("2024-01-01"), LayerKind::TransitProximity, 100.0)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn duplicate_layer_ids_are_rejected() {
        let err = LayerSnapshot::from_feed(feed(
            vec![
                layer("dup", LayerKind::BaseZone, "znet", square(0.0, 0.0, 10.0)),
                layer("dup", LayerKind::Overlay, "zimas", square(0.0, 0.0, 10.0)),
            ],
            vec![],
        ))
        .unwrap_err();
        assert!(matches!(err, FeedError::DuplicateLayer { .. }));
    }

    #[test]
    fn attribute_names_fold_and_collisions_fail() {
        let mut l = layer("z", LayerKind::BaseZone, "znet", square(0.0, 0.0, 10.0));
        l.attributes.insert("MAX_FAR".into(), AttributeValue::Integer(3));
        let snap = LayerSnapshot::from_feed(feed(vec![l.clone()], vec![])).unwrap();
        let stored = &snap.layers(LayerKind::BaseZone).unwrap()[0];
        assert!(stored.attributes.contains_key("max_far"));

        l.attributes.insert("max_far".into(), AttributeValue::Integer(2));
        assert!(matches!(
            LayerSnapshot::from_feed(feed(vec![l], vec![])),
            Err(FeedError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn summary_lists_every_kind() {
        let snap = LayerSnapshot::from_feed(feed(
            vec![layer("z", LayerKind::BaseZone, "znet", square(0.0, 0.0, 10.0))],
            vec![LayerKind::Overlay],
        ))
        .unwrap();
        let summary = snap.summary();
        assert_eq!(summary.kinds.len(), 5);
        assert_eq!(summary.kinds[&LayerKind::BaseZone].as_ref().unwrap().layers, 1);
        assert_eq!(summary.kinds[&LayerKind::Overlay].as_ref().unwrap().layers, 0);
        assert!(summary.kinds[&LayerKind::Environmental].is_none());
    }
}
