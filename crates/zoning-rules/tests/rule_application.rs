//! Rule application against the sample LA County ruleset and layer feed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use zoning_core::{Apn, Geometry, Jurisdiction, LayerKind, Quantity};
use zoning_layers::{AttributeValue, LayerFeed, LayerSnapshot};
use zoning_locator::{Parcel, ParcelRecord};
use zoning_resolver::{MatchSet, OverlayResolver};
use zoning_rules::{
    ContributionRole, Field, FieldValue, RuleConfigError, RuleEngine, RuleState, Ruleset,
    RulesetError, SkipReason, SupersededReason, TocTier,
};
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
    Arc::new(Ruleset::load(&fixture("ruleset.yaml"), &validator()).unwrap())
}

fn feed() -> LayerFeed {
    LayerFeed::load(&fixture("layers.json"), &validator()).unwrap()
}

fn parcel(apn: &str, jurisdiction: &str, geometry: Geometry) -> Parcel {
    Parcel::from_record(ParcelRecord {
        apn: Apn::parse(apn).unwrap(),
        address: "1 Test St".into(),
        city: None,
        zip: None,
        jurisdiction: Jurisdiction::new(jurisdiction).unwrap(),
        geometry,
        use_type: None,
        assessor_zoning: None,
    })
    .unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn resolve(rules: &Ruleset, snapshot: &LayerSnapshot, parcel: &Parcel, as_of: &str) -> MatchSet {
    OverlayResolver::new(rules.resolution().clone())
        .resolve(snapshot, parcel, date(as_of))
        .unwrap()
}

fn hillside_parcel() -> Parcel {
    parcel(
        "1234-005-006",
        "los_angeles_city",
        Geometry::rect(1000.0, 1000.0, 1100.0, 1100.0).unwrap(),
    )
}

fn downtown_parcel() -> Parcel {
    parcel(
        "5138-017-020",
        "los_angeles_city",
        Geometry::rect(11000.0, 1000.0, 11100.0, 1100.0).unwrap(),
    )
}

#[test]
fn hillside_r1_parcel_has_no_toc_tier_and_a_capped_height() {
    let rules = ruleset();
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let matches = resolve(&rules, &snapshot, &hillside_parcel(), "2024-01-01");
    let out = RuleEngine::new(Arc::clone(&rules))
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    assert_eq!(out.value(Field::BaseZone), Some(&FieldValue::Text("R1".into())));
    assert_eq!(
        out.value(Field::ZoneCategory),
        Some(&FieldValue::Text("Residential".into()))
    );
    assert_eq!(out.value(Field::TocTier), Some(&FieldValue::Tier(TocTier::None)));
    assert_eq!(
        out.value(Field::MaxHeight),
        Some(&FieldValue::Quantity(Quantity::from_integer(28)))
    );
    assert_eq!(
        out.value(Field::MaxFar),
        Some(&FieldValue::Quantity(Quantity::from_hundredths(45)))
    );
    assert_eq!(out.value(Field::DensityBonus), Some(&FieldValue::Percent(0)));
    assert_eq!(
        out.value(Field::Hazards),
        Some(&FieldValue::List(vec!["Very High Fire Hazard Severity Zone".into()]))
    );
    assert_eq!(out.value(Field::Environmental), Some(&FieldValue::List(vec![])));
    assert_eq!(out.value(Field::TransitAccess), Some(&FieldValue::Proximity(vec![])));

    let names: Vec<&str> = out.overlays.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Hillside"]);
    assert_eq!(out.overlays[0].rank, 1);

    // The base-zone height is kept in provenance, the hillside cap is the source.
    let height = out.field(Field::MaxHeight).unwrap();
    assert_eq!(height.source.as_ref().unwrap().rule.as_str(), "hillside-height");
    assert!(height
        .contributions
        .iter()
        .any(|c| c.rule_id.as_str() == "base-height" && c.role == ContributionRole::Set));

    let incentive = out
        .evaluation(&"toc-height".parse().unwrap())
        .unwrap();
    assert_eq!(incentive.state, RuleState::Skipped);
    assert_eq!(incentive.skip_reason, Some(SkipReason::PreconditionUnmet));
}

#[test]
fn downtown_parcel_near_rail_gets_tier_4_incentives() {
    let rules = ruleset();
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let matches = resolve(&rules, &snapshot, &downtown_parcel(), "2024-01-01");
    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    assert_eq!(out.value(Field::BaseZone), Some(&FieldValue::Text("C2".into())));
    assert_eq!(out.value(Field::TocTier), Some(&FieldValue::Tier(TocTier::Tier4)));
    assert_eq!(out.value(Field::DensityBonus), Some(&FieldValue::Percent(80)));
    // 75 capped to 45 by the HPOZ, then raised 33%.
    assert_eq!(
        out.value(Field::MaxHeight),
        Some(&FieldValue::Quantity(Quantity::from_hundredths(5985)))
    );
    // 1.5 raised 55%.
    assert_eq!(
        out.value(Field::MaxFar),
        Some(&FieldValue::Quantity(Quantity::from_hundredths(233)))
    );
    assert_eq!(
        out.value(Field::Environmental),
        Some(&FieldValue::List(vec!["Liquefaction".into(), "Methane Zone".into()]))
    );
    match out.value(Field::TransitAccess) {
        Some(FieldValue::Proximity(entries)) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].designation, "7th St/Metro Center");
            assert_eq!(entries[0].distance_ft, Quantity::from_integer(600));
        }
        other => panic!("unexpected transit access {other:?}"),
    }
    let tier_source = out.field(Field::TocTier).unwrap().source.as_ref().unwrap();
    assert_eq!(tier_source.matches, vec!["transit_proximity/metro/metro-7th-metro".to_string()]);
}

#[test]
fn expired_layers_drop_out_by_as_of() {
    let rules = ruleset();
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let before = resolve(&rules, &snapshot, &downtown_parcel(), "2023-01-01");
    let after = resolve(&rules, &snapshot, &downtown_parcel(), "2024-01-01");
    let transit = |m: &MatchSet| m.of_kind(LayerKind::TransitProximity).count();
    assert_eq!(transit(&before), 2);
    assert_eq!(transit(&after), 1);
}

#[test]
fn missing_environmental_data_only_affects_that_field() {
    let rules = ruleset();
    let mut feed = feed();
    feed.coverage.retain(|k| *k != LayerKind::Environmental);
    feed.layers.retain(|l| l.kind != LayerKind::Environmental);
    let snapshot = LayerSnapshot::from_feed(feed).unwrap();
    let matches = resolve(&rules, &snapshot, &downtown_parcel(), "2024-01-01");
    assert!(matches.is_unavailable(LayerKind::Environmental));

    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();
    assert!(out.field(Field::Environmental).unwrap().is_unavailable());
    assert!(out.unavailable_kinds.contains(&LayerKind::Environmental));
    let ev = out.evaluation(&"environmental".parse().unwrap()).unwrap();
    assert_eq!(ev.skip_reason, Some(SkipReason::LayerUnavailable));
    assert_eq!(out.value(Field::BaseZone), Some(&FieldValue::Text("C2".into())));
    assert!(out.value(Field::MaxHeight).is_some());
}

#[test]
fn jurisdiction_filter_skips_county_rules_in_the_city() {
    let rules = ruleset();
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let ag = parcel("5340-021-007", "la_county_unincorporated", Geometry::point(31500.0, 1500.0).unwrap());
    let matches = resolve(&rules, &snapshot, &ag, "2024-01-01");

    let county = RuleEngine::new(Arc::clone(&rules))
        .apply(&matches, &Jurisdiction::new("la_county_unincorporated").unwrap())
        .unwrap();
    assert_eq!(
        county.evaluation(&"csd-height".parse().unwrap()).unwrap().state,
        RuleState::Applied
    );

    let city = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();
    let ev = city.evaluation(&"csd-height".parse().unwrap()).unwrap();
    assert_eq!(ev.skip_reason, Some(SkipReason::NotApplicable));
}

fn write_yaml(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

const CONFLICTING: &str = r#"
version: conflict-test
rules:
  - id: base-zone
    tier: 0
    priority: 1
    kind: base_zone
  - id: height-a
    tier: 0
    priority: 2
    kind: zone_table
    field: max_height
    values: {R1: 33}
  - id: height-b
    tier: 0
    priority: 3
    kind: constant
    layer: base_zone
    field: max_height
    value: 36
"#;

#[test]
fn equal_precedence_contradiction_is_uncertain_not_fatal() {
    let file = write_yaml(CONFLICTING);
    let rules = Arc::new(Ruleset::load(file.path(), &validator()).unwrap());
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let matches = resolve(&rules, &snapshot, &hillside_parcel(), "2024-01-01");
    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    let height = out.field(Field::MaxHeight).unwrap();
    assert!(height.uncertain);
    assert_eq!(height.value, Some(FieldValue::Quantity(Quantity::from_integer(33))));
    let roles: Vec<ContributionRole> = height.contributions.iter().map(|c| c.role).collect();
    assert_eq!(roles, vec![ContributionRole::Set, ContributionRole::ConflictCandidate]);

    let b = out.evaluation(&"height-b".parse().unwrap()).unwrap();
    assert_eq!(b.state, RuleState::Conflicted);
    assert_eq!(b.conflicts_with.as_ref().map(|r| r.as_str()), Some("height-a"));
    let conflicts = out.conflicts();
    assert_eq!(conflicts[&Field::MaxHeight].len(), 2);
}

#[test]
fn higher_tier_set_overrides_without_conflict() {
    let body = CONFLICTING.replace("    tier: 0\n    priority: 3", "    tier: 5\n    priority: 3");
    let file = write_yaml(&body);
    let rules = Arc::new(Ruleset::load(file.path(), &validator()).unwrap());
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let matches = resolve(&rules, &snapshot, &hillside_parcel(), "2024-01-01");
    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    let height = out.field(Field::MaxHeight).unwrap();
    assert!(!height.uncertain);
    assert_eq!(height.value, Some(FieldValue::Quantity(Quantity::from_integer(36))));
    assert_eq!(height.contributions[0].role, ContributionRole::Overridden);
    assert!(out.conflicts().is_empty());
}

#[test]
fn same_name_overlays_merge_caps_and_keep_other_disagreements() {
    let rules = ruleset();
    assert!(rules.overlay_cap_attributes().contains("max_height"));

    let mut feed = feed();
    let hillside = feed
        .layers
        .iter_mut()
        .find(|l| l.layer_id.as_str() == "zimas-hillside-07")
        .unwrap();
    hillside.attributes.insert("max_height".into(), AttributeValue::Integer(32));
    hillside.attributes.insert("min_lot_size".into(), AttributeValue::Integer(7500));
    let mut second = hillside.clone();
    second.layer_id = "gis-net-hillside-02".parse().unwrap();
    second.source_id = "gis-net".parse().unwrap();
    second.attributes.insert("ordinance".into(), AttributeValue::Text("185000".into()));
    second.attributes.insert("max_height".into(), AttributeValue::Integer(30));
    second.attributes.insert("min_lot_size".into(), AttributeValue::Integer(5000));
    feed.layers.push(second);

    let snapshot = LayerSnapshot::from_feed(feed).unwrap();
    let matches = resolve(&rules, &snapshot, &hillside_parcel(), "2024-01-01");
    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    assert_eq!(out.overlays.len(), 1);
    let merged = &out.overlays[0];
    assert_eq!(merged.sources.len(), 2);
    assert_eq!(merged.attributes.get("max_height"), Some(&AttributeValue::Integer(30)));
    assert!(!merged.attributes.contains_key("min_lot_size"));
    assert!(!merged.attributes.contains_key("ordinance"));
    assert_eq!(
        merged.conflicting_attributes["min_lot_size"],
        vec![AttributeValue::Integer(7500), AttributeValue::Integer(5000)]
    );
    assert_eq!(
        merged.conflicting_attributes["ordinance"],
        vec![
            AttributeValue::Text("184802".into()),
            AttributeValue::Text("185000".into())
        ]
    );
    // The hillside envelope is still the tighter cap.
    assert_eq!(
        out.value(Field::MaxHeight),
        Some(&FieldValue::Quantity(Quantity::from_integer(28)))
    );
}

#[test]
fn duplicate_base_zone_layers_record_the_loser() {
    let rules = ruleset();
    let mut feed = feed();
    let mut dup = feed
        .layers
        .iter()
        .find(|l| l.layer_id.as_str() == "zimas-r1-0412")
        .cloned()
        .unwrap();
    dup.layer_id = "znet-r1s-0001".parse().unwrap();
    dup.source_id = "znet".parse().unwrap();
    dup.designation = "RS".into();
    feed.layers.push(dup);
    let snapshot = LayerSnapshot::from_feed(feed).unwrap();
    let matches = resolve(&rules, &snapshot, &hillside_parcel(), "2024-01-01");
    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    // zimas outranks znet in the ruleset's source ranks.
    assert_eq!(out.value(Field::BaseZone), Some(&FieldValue::Text("R1".into())));
    assert_eq!(out.superseded.len(), 1);
    assert_eq!(out.superseded[0].reason, SupersededReason::SupersededByPriority);
    assert_eq!(out.superseded[0].designation, "RS");
    assert!(out.base_zone_tie.is_none());
    assert!(!out.field(Field::BaseZone).unwrap().uncertain);
}

#[test]
fn equal_rank_base_zone_layers_that_disagree_are_a_tie() {
    let rules = ruleset();
    let mut feed = feed();
    let mut dup = feed
        .layers
        .iter()
        .find(|l| l.layer_id.as_str() == "zimas-r1-0412")
        .cloned()
        .unwrap();
    dup.layer_id = "zimas-c2-0001".parse().unwrap();
    dup.designation = "C2".into();
    feed.layers.push(dup);
    let snapshot = LayerSnapshot::from_feed(feed).unwrap();
    let matches = resolve(&rules, &snapshot, &hillside_parcel(), "2024-01-01");
    let out = RuleEngine::new(rules)
        .apply(&matches, &Jurisdiction::new("los_angeles_city").unwrap())
        .unwrap();

    // Same class, source and weight: the lower layer id wins.
    assert_eq!(out.value(Field::BaseZone), Some(&FieldValue::Text("C2".into())));
    let base = out.field(Field::BaseZone).unwrap();
    assert!(base.uncertain);

    let tie = out.base_zone_tie.as_ref().unwrap();
    assert_eq!(tie.chosen, "base_zone/zimas/zimas-c2-0001");
    assert_eq!(tie.runner_up, "base_zone/zimas/zimas-r1-0412");

    assert_eq!(out.superseded.len(), 1);
    assert_eq!(out.superseded[0].reason, SupersededReason::SupersededByTieBreak);
    assert_eq!(out.superseded[0].designation, "R1");
    assert_eq!(out.superseded[0].authoritative, "base_zone/zimas/zimas-c2-0001");
}

#[test]
fn precedence_ties_fail_at_load() {
    let body = CONFLICTING.replace("priority: 3", "priority: 2");
    let file = write_yaml(&body);
    match Ruleset::load(file.path(), &validator()) {
        Err(RulesetError::Config(RuleConfigError::DuplicatePrecedence { tier, priority, .. })) => {
            assert_eq!((tier, priority), (0, 2));
        }
        other => panic!("expected DuplicatePrecedence, got {other:?}"),
    }
}

#[test]
fn application_is_deterministic() {
    let rules = ruleset();
    let snapshot = LayerSnapshot::from_feed(feed()).unwrap();
    let engine = RuleEngine::new(rules.clone());
    let j = Jurisdiction::new("los_angeles_city").unwrap();
    let a = engine
        .apply(&resolve(&rules, &snapshot, &downtown_parcel(), "2024-01-01"), &j)
        .unwrap();
    let b = engine
        .apply(&resolve(&rules, &snapshot, &downtown_parcel(), "2024-01-01"), &j)
        .unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}
