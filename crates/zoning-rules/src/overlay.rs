//! # Overlay Ordering
//!
//! Overlay matches that contain or overlap the parcel become the
//! determination's overlay list. Matches with the same designation
//! (compared case-insensitively) merge into one entry listing every
//! source. Attributes merge as follows:
//!
//! - Equal values (numerically equal for numbers) are kept once.
//! - Flags combine by OR.
//! - Attributes the ruleset caps a field with (`layer_attribute` rules
//!   with `effect: cap` on overlays) take the minimum.
//! - Any other disagreement moves the attribute to
//!   `conflicting_attributes` with every distinct value. A lot-size
//!   minimum, a setback or an ordinance number has no safe direction.
//!
//! Entries are ranked by the ruleset's `overlay_precedence` list first,
//! then alphabetically. The merge key is unique, so ranks never tie.

use std::collections::{BTreeMap, BTreeSet};

use zoning_core::LayerKind;
use zoning_layers::AttributeValue;
use zoning_resolver::{Match, MatchSet};

use crate::output::ResolvedOverlay;

/// An overlay entry before ranking.
#[derive(Debug, Clone)]
pub(crate) struct OverlayDraft {
    key: String,
    name: String,
    sources: Vec<String>,
    attributes: BTreeMap<String, AttributeValue>,
    conflicting: BTreeMap<String, Vec<AttributeValue>>,
}

impl OverlayDraft {
    fn new(name: &str) -> Self {
        Self {
            key: name.trim().to_uppercase(),
            name: name.trim().to_string(),
            sources: Vec::new(),
            attributes: BTreeMap::new(),
            conflicting: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, m: &Match, caps: &BTreeSet<String>) {
        self.sources.push(m.match_id().to_string());
        for (name, value) in &m.layer().attributes {
            self.absorb_attribute(name, value, caps.contains(name));
        }
    }

    fn absorb_attribute(&mut self, name: &str, value: &AttributeValue, cap: bool) {
        if let Some(values) = self.conflicting.get_mut(name) {
            if !values.iter().any(|v| same_value(v, value)) {
                values.push(value.clone());
            }
            return;
        }
        let Some(existing) = self.attributes.get(name) else {
            self.attributes.insert(name.to_string(), value.clone());
            return;
        };
        match merge_value(existing, value, cap) {
            Merged::Keep => {}
            Merged::Replace(merged) => {
                self.attributes.insert(name.to_string(), merged);
            }
            Merged::Conflict => {
                if let Some(first) = self.attributes.remove(name) {
                    self.conflicting
                        .insert(name.to_string(), vec![first, value.clone()]);
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Merged {
    Keep,
    Replace(AttributeValue),
    Conflict,
}

/// Equal as written, or equal as quantities (`45` and `"45 ft"`).
fn same_value(a: &AttributeValue, b: &AttributeValue) -> bool {
    match (a.as_quantity(), b.as_quantity()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// How an incoming value combines with the one already merged.
fn merge_value(existing: &AttributeValue, incoming: &AttributeValue, cap: bool) -> Merged {
    if same_value(existing, incoming) {
        return Merged::Keep;
    }
    match (existing, incoming) {
        (AttributeValue::Flag(a), AttributeValue::Flag(b)) => {
            Merged::Replace(AttributeValue::Flag(*a || *b))
        }
        _ if cap => match (existing.as_quantity(), incoming.as_quantity()) {
            (Some(a), Some(b)) if b < a => Merged::Replace(incoming.clone()),
            (Some(_), Some(_)) => Merged::Keep,
            _ => Merged::Conflict,
        },
        _ => Merged::Conflict,
    }
}

/// Merge intersecting Overlay matches by designation.
pub(crate) fn merge(matches: &MatchSet, caps: &BTreeSet<String>) -> Vec<OverlayDraft> {
    let mut drafts: BTreeMap<String, OverlayDraft> = BTreeMap::new();
    for m in matches
        .of_kind(LayerKind::Overlay)
        .filter(|m| m.intersection().is_intersecting())
    {
        let key = m.designation().trim().to_uppercase();
        drafts
            .entry(key)
            .or_insert_with(|| OverlayDraft::new(m.designation()))
            .absorb(m, caps);
    }
    drafts.into_values().collect()
}

/// Rank drafts: listed names in list order, then the rest by name.
pub(crate) fn rank(drafts: Vec<OverlayDraft>, precedence: &[String]) -> Vec<ResolvedOverlay> {
    let listed: BTreeMap<String, usize> = precedence
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_uppercase(), i))
        .collect();
    let mut keyed: Vec<((usize, String), OverlayDraft)> = drafts
        .into_iter()
        .map(|d| {
            let position = listed.get(&d.key).copied().unwrap_or(usize::MAX);
            ((position, d.key.clone()), d)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed
        .into_iter()
        .zip(1u32..)
        .map(|((_, d), rank)| ResolvedOverlay {
            rank,
            name: d.name,
            sources: d.sources,
            attributes: d.attributes,
            conflicting_attributes: d.conflicting,
        })
        .collect()
}

/// The ordered overlay list for a match set. `caps` names the
/// attributes that merge to their minimum.
pub fn resolve_overlays(
    matches: &MatchSet,
    precedence: &[String],
    caps: &BTreeSet<String>,
) -> Vec<ResolvedOverlay> {
    rank(merge(matches, caps), precedence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zoning_core::Quantity;

    fn draft(name: &str, source: &str) -> OverlayDraft {
        let mut d = OverlayDraft::new(name);
        d.sources.push(source.to_string());
        d
    }

    #[test]
    fn listed_overlays_come_first_in_list_order() {
        let drafts = vec![
            draft("Zeta", "a"),
            draft("Hillside", "b"),
            draft("Alpha", "c"),
            draft("Specific Plan", "d"),
        ];
        let ranked = rank(drafts, &["Specific Plan".into(), "hillside".into()]);
        let names: Vec<&str> = ranked.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Specific Plan", "Hillside", "Alpha", "Zeta"]);
        let ranks: Vec<u32> = ranked.iter().map(|o| o.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn capping_attributes_merge_to_the_minimum() {
        let q = |h| AttributeValue::Decimal(Quantity::from_hundredths(h));
        assert_eq!(
            merge_value(&AttributeValue::Integer(45), &q(2800), true),
            Merged::Replace(q(2800))
        );
        assert_eq!(merge_value(&q(2800), &AttributeValue::Integer(45), true), Merged::Keep);
        assert_eq!(merge_value(&q(4500), &AttributeValue::Integer(45), false), Merged::Keep);
        assert_eq!(
            merge_value(&AttributeValue::Flag(false), &AttributeValue::Flag(true), false),
            Merged::Replace(AttributeValue::Flag(true))
        );
    }

    #[test]
    fn other_disagreements_are_kept_as_conflicts() {
        assert_eq!(
            merge_value(&AttributeValue::Integer(5000), &AttributeValue::Integer(7500), false),
            Merged::Conflict
        );
        assert_eq!(
            merge_value(&AttributeValue::Text("a".into()), &AttributeValue::Text("b".into()), true),
            Merged::Conflict
        );

        let mut d = draft("Hillside", "a");
        d.absorb_attribute("min_lot_size", &AttributeValue::Integer(7500), false);
        d.absorb_attribute("ordinance", &AttributeValue::Integer(184802), false);
        d.absorb_attribute("max_height", &AttributeValue::Integer(45), true);
        d.absorb_attribute("min_lot_size", &AttributeValue::Integer(5000), false);
        d.absorb_attribute("ordinance", &AttributeValue::Integer(184802), false);
        d.absorb_attribute("max_height", &AttributeValue::Integer(36), true);
        d.absorb_attribute("min_lot_size", &AttributeValue::Integer(7500), false);
        d.absorb_attribute("min_lot_size", &AttributeValue::Integer(10000), false);

        assert_eq!(d.attributes.get("ordinance"), Some(&AttributeValue::Integer(184802)));
        assert_eq!(d.attributes.get("max_height"), Some(&AttributeValue::Integer(36)));
        assert!(!d.attributes.contains_key("min_lot_size"));
        assert_eq!(
            d.conflicting["min_lot_size"],
            vec![
                AttributeValue::Integer(7500),
                AttributeValue::Integer(5000),
                AttributeValue::Integer(10000)
            ]
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ranks_are_total_and_order_independent(
                names in proptest::collection::btree_set("[A-Z][a-z]{0,6}", 0..8),
                listed in proptest::collection::vec("[A-Z][a-z]{0,6}", 0..4),
                seed in any::<u64>(),
            ) {
                let names: Vec<String> = names.into_iter().collect();
                let forward: Vec<OverlayDraft> = names.iter().map(|n| draft(n, n)).collect();
                let mut shuffled = forward.clone();
                let len = shuffled.len();
                if len > 1 {
                    shuffled.rotate_left((seed as usize) % len);
                    shuffled.reverse();
                }
                let listed: Vec<String> = {
                    let mut seen = std::collections::BTreeSet::new();
                    listed.into_iter().filter(|n| seen.insert(n.to_uppercase())).collect()
                };

                let a = rank(forward, &listed);
                let b = rank(shuffled, &listed);
                prop_assert_eq!(&a, &b);
                let ranks: Vec<u32> = a.iter().map(|o| o.rank).collect();
                let expected: Vec<u32> = (1..=a.len() as u32).collect();
                prop_assert_eq!(ranks, expected);
            }
        }
    }
}
