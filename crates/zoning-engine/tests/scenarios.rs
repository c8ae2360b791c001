//! End-to-end resolution against the sample LA County fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use zoning_core::{LayerKind, SnapshotVersion};
use zoning_engine::{
    load_ruleset, AsOfPolicy, BatchItem, RefreshError, ResolutionRequest, ResolveError,
    ZoningEngine,
};
use zoning_layers::{LayerFeed, LayerSnapshot, LayerStore, StaticFeedSource};
use zoning_locator::{CountingParcelIndex, InMemoryParcelIndex, ParcelIndex};
use zoning_rules::Ruleset;
use zoning_schema::SchemaValidator;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn validator() -> SchemaValidator {
    SchemaValidator::new().unwrap()
}

fn ruleset() -> Arc<Ruleset> {
    Arc::new(load_ruleset(&fixture("ruleset.yaml"), &validator()).unwrap())
}

fn feed() -> LayerFeed {
    LayerFeed::load(&fixture("layers.json"), &validator()).unwrap()
}

fn parcels() -> InMemoryParcelIndex {
    InMemoryParcelIndex::load(&fixture("parcels.json")).unwrap()
}

fn engine_with(ruleset: Arc<Ruleset>, feed: LayerFeed) -> ZoningEngine {
    let store = Arc::new(LayerStore::new(LayerSnapshot::from_feed(feed).unwrap(), 4));
    ZoningEngine::new(ruleset, store, Arc::new(parcels()))
        .with_default_as_of(AsOfPolicy::Fixed(date("2024-01-01")))
}

fn engine() -> ZoningEngine {
    engine_with(ruleset(), feed())
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn json(d: &zoning_determination::Determination) -> Value {
    serde_json::from_str(&d.to_json().unwrap()).unwrap()
}

fn overlay_names(v: &Value) -> Vec<String> {
    v["overlays"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap().to_string())
        .collect()
}

fn has_warning(v: &Value, warning: &str, key: &str, value: &str) -> bool {
    v["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["warning"] == warning && w[key] == value)
}

// ── Section scenarios ───────────────────────────────────────────────

#[tokio::test]
async fn hillside_r1_parcel_is_not_toc_eligible() {
    let engine = engine();
    let request = ResolutionRequest::new("1234-005-006").as_of(date("2024-01-01"));
    let d = engine.resolve(&request).await.unwrap();
    let v = json(&d);

    assert_eq!(v["base_zone"]["value"], "R1");
    assert_eq!(overlay_names(&v), vec!["Hillside"]);
    assert_eq!(v["eligibilities"]["toc_tier"]["value"], "none");
    assert_eq!(v["eligibilities"]["max_height"]["value"], "28");
    assert_eq!(v["eligibilities"]["max_far"]["value"], "0.45");
    assert_eq!(v["layer_snapshot_version"], "2024-01-15.1");
    assert_eq!(v["ruleset_version"], "la-county-2024.1");
    assert_eq!(v["as_of"], "2024-01-01");
    assert!(!d.is_partial());
    assert!(d.id().to_string().starts_with("sha256:"));
}

#[tokio::test]
async fn ambiguous_address_fails_before_any_layer_query() {
    let counting = Arc::new(CountingParcelIndex::new(parcels()));
    // An empty snapshot: any layer query would yield a partial
    // determination rather than an error.
    let store = Arc::new(LayerStore::new(
        LayerSnapshot::empty(SnapshotVersion::new("empty").unwrap()),
        2,
    ));
    let index: Arc<dyn ParcelIndex> = counting.clone();
    let engine = ZoningEngine::new(ruleset(), store, index);

    let err = engine
        .resolve(&ResolutionRequest::new("123 Main St"))
        .await
        .unwrap_err();

    match &err {
        ResolveError::AmbiguousInput { candidates, .. } => {
            let apns: Vec<String> = candidates.iter().map(ToString::to_string).collect();
            assert_eq!(apns, vec!["5152-010-001", "5340-021-007"]);
        }
        other => panic!("expected AmbiguousInput, got {other:?}"),
    }
    assert!(err.is_resolution_error());
    assert_eq!(counting.address_lookups(), 1);
    assert_eq!(counting.apn_lookups(), 0);
}

#[tokio::test]
async fn missing_environmental_data_yields_a_partial_determination() {
    let mut feed = feed();
    feed.snapshot_version = SnapshotVersion::new("2024-01-15.2").unwrap();
    feed.coverage.retain(|k| *k != LayerKind::Environmental);
    feed.layers.retain(|l| l.kind != LayerKind::Environmental);
    let engine = engine_with(ruleset(), feed);

    let d = engine
        .resolve(&ResolutionRequest::new("5138-017-020"))
        .await
        .unwrap();
    let v = json(&d);

    assert!(d.is_partial());
    assert_eq!(v["partial"], true);
    assert_eq!(v["environmental"]["unavailable"], true);
    assert!(v["environmental"].get("value").is_none());
    assert!(has_warning(&v, "layer_unavailable", "kind", "environmental"));
    assert!(has_warning(&v, "field_unavailable", "field", "environmental"));

    // Everything else still resolves.
    assert_eq!(v["base_zone"]["value"], "C2");
    assert_eq!(v["eligibilities"]["toc_tier"]["value"], "tier_4");
    assert_eq!(v["hazards"]["value"], serde_json::json!([]));
}

#[tokio::test]
async fn contradicting_equal_precedence_rules_mark_the_field_uncertain() {
    let text = std::fs::read_to_string(fixture("ruleset.yaml")).unwrap();
    let extra = "  - id: flat-height\n    tier: 0\n    priority: 35\n    kind: constant\n    \
                 layer: base_zone\n    field: max_height\n    value: 40\n\n  - id: base-far\n";
    let text = text.replacen("  - id: base-far\n", extra, 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ruleset.yaml");
    std::fs::write(&path, text).unwrap();
    let rules = Arc::new(load_ruleset(&path, &validator()).unwrap());
    let engine = engine_with(rules, feed());

    let d = engine
        .resolve(&ResolutionRequest::new("5152-010-001"))
        .await
        .unwrap();
    let v = json(&d);

    let height = &v["eligibilities"]["max_height"];
    assert_eq!(height["uncertain"], true);
    assert_eq!(height["value"], "33");
    assert!(has_warning(&v, "conflicting_rules", "field", "max_height"));
    let conflicted = v["rule_trace"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["rule_id"] == "flat-height")
        .unwrap();
    assert_eq!(conflicted["state"], "conflicted");
}

#[tokio::test]
async fn equal_rank_base_zones_that_disagree_are_flagged() {
    let mut feed = feed();
    let mut twin = feed
        .layers
        .iter()
        .find(|l| l.layer_id.as_str() == "zimas-r1-0412")
        .cloned()
        .unwrap();
    twin.layer_id = "zimas-c2-0001".parse().unwrap();
    twin.designation = "C2".into();
    feed.layers.push(twin);
    let engine = engine_with(ruleset(), feed);

    let d = engine
        .resolve(&ResolutionRequest::new("1234-005-006"))
        .await
        .unwrap();
    let v = json(&d);

    assert_eq!(v["base_zone"]["value"], "C2");
    assert_eq!(v["base_zone"]["uncertain"], true);
    assert!(has_warning(&v, "base_zone_tie", "chosen", "base_zone/zimas/zimas-c2-0001"));
    assert!(has_warning(&v, "base_zone_tie", "runner_up", "base_zone/zimas/zimas-r1-0412"));

    assert_eq!(v["superseded"][0]["match_id"], "base_zone/zimas/zimas-r1-0412");
    assert_eq!(v["superseded"][0]["reason"], "superseded_by_tie_break");
    assert!(v["provenance"].as_array().unwrap().iter().any(|p| {
        p["field"] == "base_zone"
            && p["match"] == "base_zone/zimas/zimas-r1-0412"
            && p["role"] == "superseded"
    }));
}

// ── Determinism and provenance ──────────────────────────────────────

#[tokio::test]
async fn repeated_resolution_is_byte_identical() {
    let request = ResolutionRequest::new("5138-017-020").as_of(date("2024-01-01"));
    let first = engine().resolve(&request).await.unwrap();
    let second = engine().resolve(&request).await.unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.id(), second.id());

    let earlier = engine()
        .resolve(&ResolutionRequest::new("5138-017-020").as_of(date("2023-01-01")))
        .await
        .unwrap();
    assert_ne!(first.id(), earlier.id());
}

#[tokio::test]
async fn every_reported_field_has_provenance() {
    let engine = engine();
    for apn in ["1234-005-006", "5138-017-020", "5152-010-001", "5340-021-007"] {
        let d = engine.resolve(&ResolutionRequest::new(apn)).await.unwrap();
        let v = json(&d);
        let traced: Vec<&str> = v["provenance"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["field"].as_str().unwrap())
            .collect();

        let mut fields: Vec<(&str, &Value)> = vec![
            ("base_zone", &v["base_zone"]),
            ("zone_category", &v["zone_category"]),
            ("environmental", &v["environmental"]),
            ("hazards", &v["hazards"]),
            ("transit_access", &v["transit_access"]),
        ];
        for (name, field) in v["eligibilities"].as_object().unwrap() {
            fields.push((name.as_str(), field));
        }
        for (name, field) in fields {
            if field.get("unavailable").is_none() {
                assert!(traced.contains(&name), "{apn}: {name} has no provenance");
            }
        }
        for overlay in v["overlays"].as_array().unwrap() {
            let label = format!("overlays[{}]", overlay["rank"]);
            assert!(traced.contains(&label.as_str()), "{apn}: {label} has no provenance");
        }
    }
}

#[tokio::test]
async fn overlay_ranks_are_distinct() {
    let engine = engine();
    for apn in ["1234-005-006", "5138-017-020", "5340-021-007"] {
        let d = engine.resolve(&ResolutionRequest::new(apn)).await.unwrap();
        let mut ranks: Vec<u32> = d.body().overlays.iter().map(|o| o.rank).collect();
        let before = ranks.len();
        ranks.dedup();
        assert_eq!(ranks.len(), before, "{apn}: duplicate overlay rank");
    }
}

// ── Snapshots ───────────────────────────────────────────────────────

#[tokio::test]
async fn pinned_requests_survive_a_refresh() {
    let mut next = feed();
    next.snapshot_version = SnapshotVersion::new("2024-02-01.1").unwrap();
    next.layers.retain(|l| l.designation != "Hillside");
    let engine = engine().with_feed_source(Arc::new(StaticFeedSource::new(next)));

    let installed = engine.refresh_layers().await.unwrap();
    assert_eq!(installed.as_str(), "2024-02-01.1");

    let current = engine
        .resolve(&ResolutionRequest::new("1234-005-006"))
        .await
        .unwrap();
    assert!(current.body().overlays.is_empty());
    assert_eq!(current.body().layer_snapshot_version.as_str(), "2024-02-01.1");

    let pinned = engine
        .resolve(
            &ResolutionRequest::new("1234-005-006")
                .pinned(SnapshotVersion::new("2024-01-15.1").unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(pinned.body().overlays.len(), 1);
    assert_eq!(pinned.body().layer_snapshot_version.as_str(), "2024-01-15.1");

    let err = engine
        .resolve(
            &ResolutionRequest::new("1234-005-006")
                .pinned(SnapshotVersion::new("2019-01-01.1").unwrap()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::SnapshotNotRetained { .. }));
}

#[tokio::test]
async fn refresh_without_a_source_is_an_error() {
    let err = engine().refresh_layers().await.unwrap_err();
    assert!(matches!(err, RefreshError::NoFeedSource));
}

// ── Batch ───────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_keeps_input_order_and_isolates_failures() {
    let engine = Arc::new(engine().with_batch_concurrency(2));
    let inputs = [
        "1234-005-006",
        "123 Main St",
        "800 W Olympic Blvd, Los Angeles, CA 90015",
        "0000-000-000",
        "5340-021-007",
    ];
    let items: Vec<BatchItem> = engine
        .resolve_batch(inputs.iter().map(|i| ResolutionRequest::new(*i)).collect())
        .await;

    let got: Vec<&str> = items.iter().map(|i| i.input.as_str()).collect();
    assert_eq!(got, inputs);
    assert!(items[0].result.is_ok());
    assert!(matches!(items[1].result, Err(ResolveError::AmbiguousInput { .. })));
    assert_eq!(
        items[2].result.as_ref().unwrap().body().parcel.apn.to_string(),
        "5138-017-020"
    );
    assert!(matches!(items[3].result, Err(ResolveError::NotFound { .. })));
    assert!(items[4].result.is_ok());

    let v = serde_json::to_value(&items).unwrap();
    assert_eq!(v[1]["input"], "123 Main St");
    assert_eq!(v[1]["error"]["kind"], "ambiguous_input");
    assert!(v[1].get("determination").is_none());
    assert_eq!(v[0]["determination"]["base_zone"]["value"], "R1");
}

#[tokio::test]
async fn layer_summary_reports_every_kind() {
    let summary = engine().layer_summary();
    assert_eq!(summary.snapshot_version.as_str(), "2024-01-15.1");
    for kind in LayerKind::all() {
        assert!(summary.kinds[kind].is_some(), "{kind} not loaded");
    }
}
