//! Refresh atomicity: concurrent readers see one whole snapshot or the
//! other, never a mix.

use std::collections::BTreeMap;
use std::sync::Arc;

use zoning_core::{EffectiveRange, Geometry, LayerId, LayerKind, SnapshotVersion, SourceId};
use zoning_layers::{AttributeValue, LayerFeed, LayerSnapshot, LayerStore, RegulatoryLayer};

fn feed(version: &str, zone: &str) -> LayerFeed {
    let layers = (0..20)
        .map(|i| {
            let mut attributes = BTreeMap::new();
            attributes.insert(
                "snapshot".to_string(),
                AttributeValue::Text(version.to_string()),
            );
            RegulatoryLayer {
                layer_id: LayerId::new(format!("{version}-{i}")).unwrap(),
                kind: if i % 2 == 0 { LayerKind::BaseZone } else { LayerKind::Overlay },
                source_id: SourceId::new("znet").unwrap(),
                designation: zone.to_string(),
                geometry: Geometry::rect(0.0, 0.0, 1000.0, 1000.0).unwrap(),
                attributes,
                effective: EffectiveRange::since("2000-01-01".parse().unwrap()),
            }
        })
        .collect();
    LayerFeed {
        snapshot_version: SnapshotVersion::new(version).unwrap(),
        description: None,
        coverage: vec![],
        layers,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_observe_mixed_snapshots() {
    let store = Arc::new(LayerStore::new(
        LayerSnapshot::from_feed(feed("v0", "R1")).unwrap(),
        3,
    ));
    let parcel = Geometry::rect(10.0, 10.0, 20.0, 20.0).unwrap();
    let as_of = "2024-01-01".parse().unwrap();

    let mut readers = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let parcel = parcel.clone();
        readers.spawn(async move {
            for _ in 0..200 {
                let snapshot = store.current();
                let version = snapshot.version().to_string();
                for kind in [LayerKind::BaseZone, LayerKind::Overlay] {
                    let layers = snapshot
                        .layers_intersecting(&parcel, as_of, kind, 0.0)
                        .unwrap();
                    assert_eq!(layers.len(), 10);
                    for layer in layers {
                        assert_eq!(
                            layer.attribute("snapshot"),
                            Some(&AttributeValue::Text(version.clone()))
                        );
                    }
                }
                tokio::task::yield_now().await;
            }
        });
    }

    for n in 1..=10 {
        let next = LayerSnapshot::from_feed(feed(&format!("v{n}"), "C2")).unwrap();
        store.install(next).unwrap();
        tokio::task::yield_now().await;
    }

    while let Some(result) = readers.join_next().await {
        result.unwrap();
    }
    assert_eq!(store.current().version().as_str(), "v10");
    assert_eq!(store.retained_versions().len(), 3);
}

#[test]
fn pinned_snapshot_survives_later_installs_within_retention() {
    let store = LayerStore::new(LayerSnapshot::from_feed(feed("v0", "R1")).unwrap(), 2);
    let pinned = SnapshotVersion::new("v0").unwrap();
    store
        .install(LayerSnapshot::from_feed(feed("v1", "R2")).unwrap())
        .unwrap();
    let snap = store.pinned(&pinned).unwrap();
    assert_eq!(snap.layers(LayerKind::BaseZone).unwrap()[0].designation, "R1");
}
