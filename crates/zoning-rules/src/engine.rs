//! # Rule Engine
//!
//! Applies a compiled [`Ruleset`] to a [`MatchSet`]. Rules run in
//! evaluation order (phase, tier, priority); each one is turned into a
//! proposal (skip, or write a value with an effect) and the proposal is
//! committed to the field table, which decides between apply, override
//! and conflict.
//!
//! ## Write Semantics
//!
//! - `set` on an empty field stores the value.
//! - `set` at higher precedence overrides; earlier contributions are kept
//!   in provenance as `overridden`.
//! - `set` at equal precedence with the same value corroborates; with a
//!   different value it is `Conflicted`. The field becomes uncertain and
//!   the first value stays reported.
//! - `cap` lowers to the minimum. Caps combine by min, never conflict.
//! - `raise` (TOC incentives) increases by a percentage.
//!
//! `cap` and `raise` need an existing value; without one the rule is
//! skipped with `dependency_unavailable`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use zoning_core::{Jurisdiction, LayerKind, Quantity, RuleId};
use zoning_resolver::{Match, MatchSet};

use crate::error::RuleEngineError;
use crate::evaluation::{RuleEvaluation, SkipReason};
use crate::field::{Field, FieldValue, ProximityEntry, TocTier};
use crate::output::{
    BaseZoneTie, Contribution, ContributionRole, FieldSource, ResolvedField, RuleCoreOutput,
    SupersededMatch, SupersededReason,
};
use crate::overlay::resolve_overlays;
use crate::ruleset::{Effect, Precedence, Rule, RuleAction, Ruleset, Selector};

// ─── Proposals ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Set(FieldValue),
    Cap(FieldValue),
    Raise(u32),
}

#[derive(Debug)]
enum Proposal {
    Skip {
        reason: SkipReason,
        detail: String,
    },
    Write {
        op: Op,
        matches: Vec<String>,
        note: String,
    },
}

impl Proposal {
    fn skip(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self::Skip {
            reason,
            detail: detail.into(),
        }
    }

    fn set(value: FieldValue, matches: Vec<String>, note: impl Into<String>) -> Self {
        Self::Write {
            op: Op::Set(value),
            matches,
            note: note.into(),
        }
    }

    fn with_effect(effect: Effect, value: FieldValue, matches: Vec<String>, note: String) -> Self {
        let op = match effect {
            Effect::Set => Op::Set(value),
            Effect::Cap => Op::Cap(value),
        };
        Self::Write { op, matches, note }
    }
}

// ─── Field Table ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Slot {
    value: Option<FieldValue>,
    set_value: Option<FieldValue>,
    precedence: Option<Precedence>,
    setter: Option<RuleId>,
    source: Option<FieldSource>,
    uncertain: bool,
    contributions: Vec<Contribution>,
}

#[derive(Debug, Default)]
struct FieldTable {
    slots: BTreeMap<Field, Slot>,
}

impl FieldTable {
    fn value(&self, field: Field) -> Option<&FieldValue> {
        self.slots.get(&field).and_then(|s| s.value.as_ref())
    }

    fn source_matches(&self, field: Field) -> Vec<String> {
        self.slots
            .get(&field)
            .and_then(|s| s.source.as_ref())
            .map(|s| s.matches.clone())
            .unwrap_or_default()
    }

    fn mark_uncertain(&mut self, field: Field) {
        self.slots.entry(field).or_default().uncertain = true;
    }

    fn commit(
        &mut self,
        rule: &Rule,
        op: Op,
        matches: Vec<String>,
        note: &str,
        ev: &mut RuleEvaluation,
    ) -> Result<(), RuleEngineError> {
        let field = rule.action.field();
        let precedence = rule.precedence();
        let slot = self.slots.entry(field).or_default();

        match op {
            Op::Set(value) => {
                let current = slot.precedence.map(|p| precedence.cmp(&p));
                match (current, slot.setter.clone()) {
                    (Some(Ordering::Equal), Some(setter)) => {
                        if slot.set_value.as_ref() == Some(&value) {
                            slot.contributions.push(contribution(rule, &matches, &value, ContributionRole::Set));
                            ev.apply(value, matches, "corroborates the applied value")?;
                        } else {
                            slot.uncertain = true;
                            slot.contributions.push(contribution(
                                rule,
                                &matches,
                                &value,
                                ContributionRole::ConflictCandidate,
                            ));
                            ev.conflict(value, matches, setter)?;
                        }
                    }
                    (Some(Ordering::Less), Some(setter)) => {
                        ev.skip(
                            SkipReason::PreconditionUnmet,
                            &format!("{field} already set by {setter} at higher precedence"),
                        )?;
                    }
                    _ => {
                        for c in &mut slot.contributions {
                            if c.role.is_effective() {
                                c.role = ContributionRole::Overridden;
                            }
                        }
                        // A conflict at the old precedence no longer matters.
                        slot.uncertain = false;
                        slot.contributions.push(contribution(rule, &matches, &value, ContributionRole::Set));
                        slot.value = Some(value.clone());
                        slot.set_value = Some(value.clone());
                        slot.precedence = Some(precedence);
                        slot.setter = Some(rule.id.clone());
                        slot.source = Some(FieldSource {
                            rule: rule.id.clone(),
                            matches: matches.clone(),
                        });
                        ev.apply(value, matches, note)?;
                    }
                }
            }
            Op::Cap(limit) => {
                let Some(current) = slot.value.as_ref() else {
                    return ev.skip(
                        SkipReason::DependencyUnavailable,
                        &format!("cap on {field} with no value to cap"),
                    );
                };
                let Some(capped) = current.min_numeric(&limit) else {
                    return ev.skip(
                        SkipReason::DependencyUnavailable,
                        &format!("{field} value {current} is not numeric"),
                    );
                };
                slot.contributions.push(contribution(rule, &matches, &limit, ContributionRole::Cap));
                if &capped != current {
                    slot.value = Some(capped);
                    slot.source = Some(FieldSource {
                        rule: rule.id.clone(),
                        matches: matches.clone(),
                    });
                    ev.apply(limit, matches, note)?;
                } else {
                    ev.apply(limit, matches, &format!("{note} (does not bind)"))?;
                }
            }
            Op::Raise(percent) => {
                let Some(FieldValue::Quantity(current)) = slot.value.as_ref() else {
                    return ev.skip(
                        SkipReason::DependencyUnavailable,
                        &format!("no numeric {field} to raise"),
                    );
                };
                let raised = FieldValue::Quantity(current.increased_by_percent(percent));
                slot.contributions.push(contribution(rule, &matches, &raised, ContributionRole::Raise));
                slot.value = Some(raised.clone());
                slot.source = Some(FieldSource {
                    rule: rule.id.clone(),
                    matches: matches.clone(),
                });
                ev.apply(raised, matches, note)?;
            }
        }
        Ok(())
    }

    fn into_fields(mut self) -> BTreeMap<Field, ResolvedField> {
        Field::all()
            .iter()
            .map(|field| {
                let slot = self.slots.remove(field).unwrap_or_default();
                (
                    *field,
                    ResolvedField {
                        value: slot.value,
                        source: slot.source,
                        uncertain: slot.uncertain,
                        contributions: slot.contributions,
                    },
                )
            })
            .collect()
    }
}

fn contribution(rule: &Rule, matches: &[String], value: &FieldValue, role: ContributionRole) -> Contribution {
    Contribution {
        rule_id: rule.id.clone(),
        matches: matches.to_vec(),
        value: value.clone(),
        role,
    }
}

// ─── Base Zone Selection ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct BaseZoneOutcome {
    superseded: Vec<SupersededMatch>,
    tie: Option<BaseZoneTie>,
}

fn zone_value(m: &Match, attribute: Option<&str>) -> Option<String> {
    match attribute {
        Some(name) => m.attribute(name).map(|v| v.to_string().trim().to_string()),
        None => Some(m.designation().trim().to_string()),
    }
}

fn select_base_zone(
    matches: &MatchSet,
    attribute: Option<&str>,
    outcome: &mut BaseZoneOutcome,
) -> Proposal {
    if matches.is_unavailable(LayerKind::BaseZone) {
        return Proposal::skip(SkipReason::LayerUnavailable, "base zone layers are not loaded");
    }
    let candidates: Vec<&Match> = matches
        .of_kind(LayerKind::BaseZone)
        .filter(|m| m.intersection().is_intersecting())
        .collect();
    let Some((winner, losers)) = candidates.split_first() else {
        return Proposal::skip(
            SkipReason::PreconditionUnmet,
            "no base zone layer intersects the parcel",
        );
    };
    let Some(zone) = zone_value(winner, attribute) else {
        return Proposal::skip(
            SkipReason::InsufficientData,
            format!(
                "base zone match {} has no attribute {}",
                winner.match_id(),
                attribute.unwrap_or_default()
            ),
        );
    };

    for loser in losers {
        let reason = if loser.intersection() != winner.intersection() {
            SupersededReason::SupersededByRelation
        } else if loser.source_rank() != winner.source_rank() {
            SupersededReason::SupersededByPriority
        } else {
            SupersededReason::SupersededByTieBreak
        };
        outcome.superseded.push(SupersededMatch {
            match_id: loser.match_id().to_string(),
            designation: loser.designation().to_string(),
            reason,
            authoritative: winner.match_id().to_string(),
        });
    }

    if let Some(runner_up) = losers.first() {
        let same_footing = runner_up.intersection() == winner.intersection()
            && runner_up.source_rank() == winner.source_rank();
        let disagrees = zone_value(runner_up, attribute)
            .map_or(true, |other| !other.eq_ignore_ascii_case(&zone));
        if same_footing && disagrees {
            outcome.tie = Some(BaseZoneTie {
                chosen: winner.match_id().to_string(),
                runner_up: runner_up.match_id().to_string(),
            });
        }
    }

    let note = if losers.is_empty() {
        format!("authoritative base zone {zone}")
    } else {
        format!("authoritative base zone {zone}; {} superseded", losers.len())
    };
    Proposal::set(FieldValue::Text(zone), vec![winner.match_id().to_string()], note)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn ids(matches: &[&Match]) -> Vec<String> {
    matches.iter().map(|m| m.match_id().to_string()).collect()
}

/// Matches a selector reads, or the skip when the kind is unavailable.
fn select<'m>(matches: &'m MatchSet, selector: &Selector) -> Result<Vec<&'m Match>, Proposal> {
    if matches.is_unavailable(selector.layer) {
        return Err(Proposal::skip(
            SkipReason::LayerUnavailable,
            format!("{} layers are not loaded", selector.layer),
        ));
    }
    Ok(matches
        .of_kind(selector.layer)
        .filter(|m| selector.include_adjacent || m.intersection().is_intersecting())
        .filter(|m| {
            selector
                .designation
                .as_deref()
                .map_or(true, |d| m.designation().trim().eq_ignore_ascii_case(d))
        })
        .collect())
}

fn prefix_match<'a>(zone: &str, prefixes: &'a [String]) -> Option<&'a str> {
    prefixes
        .iter()
        .filter(|p| zone.starts_with(p.as_str()))
        .max_by_key(|p| p.len())
        .map(String::as_str)
}

fn distance_of(m: &Match) -> Quantity {
    if m.intersection().is_intersecting() {
        Quantity::ZERO
    } else {
        m.distance_ft().unwrap_or(Quantity::ZERO)
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Applies a compiled ruleset to match sets.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    ruleset: Arc<Ruleset>,
}

impl RuleEngine {
    /// Engine over a compiled ruleset.
    pub fn new(ruleset: Arc<Ruleset>) -> Self {
        Self { ruleset }
    }

    /// The ruleset.
    pub fn ruleset(&self) -> &Arc<Ruleset> {
        &self.ruleset
    }

    /// Evaluate every rule against `matches` for a parcel in
    /// `jurisdiction`.
    ///
    /// Data gaps never fail: they become skipped evaluations and
    /// unavailable fields. An error here means the state machine itself
    /// was violated.
    pub fn apply(
        &self,
        matches: &MatchSet,
        jurisdiction: &Jurisdiction,
    ) -> Result<RuleCoreOutput, RuleEngineError> {
        let mut table = FieldTable::default();
        let mut base = BaseZoneOutcome::default();
        let mut evaluations = Vec::with_capacity(self.ruleset.rules().len());

        for rule in self.ruleset.rules() {
            let mut ev = RuleEvaluation::pending(rule);
            let proposal = if rule.applies_in(jurisdiction) {
                self.propose(rule, matches, &table, &mut base)
            } else {
                Proposal::skip(
                    SkipReason::NotApplicable,
                    format!("rule does not apply in {jurisdiction}"),
                )
            };
            match proposal {
                Proposal::Skip { reason, detail } => ev.skip(reason, &detail)?,
                Proposal::Write { op, matches, note } => {
                    table.commit(rule, op, matches, &note, &mut ev)?
                }
            }
            tracing::debug!(
                rule = %rule.id,
                field = %ev.field,
                state = %ev.state,
                reason = ev.transitions.last().map(|t| t.reason.as_str()).unwrap_or_default(),
                "rule evaluated"
            );
            evaluations.push(ev);
        }

        if base.tie.is_some() {
            table.mark_uncertain(Field::BaseZone);
        }

        let overlays_unavailable = matches.is_unavailable(LayerKind::Overlay);
        let overlays = if overlays_unavailable {
            Vec::new()
        } else {
            resolve_overlays(
                matches,
                self.ruleset.overlay_precedence(),
                &self.ruleset.overlay_cap_attributes(),
            )
        };

        Ok(RuleCoreOutput {
            fields: table.into_fields(),
            overlays,
            overlays_unavailable,
            unavailable_kinds: matches.unavailable().clone(),
            superseded: base.superseded,
            base_zone_tie: base.tie,
            evaluations,
        })
    }

    fn propose(
        &self,
        rule: &Rule,
        matches: &MatchSet,
        table: &FieldTable,
        base: &mut BaseZoneOutcome,
    ) -> Proposal {
        let field = rule.action.field();
        match &rule.action {
            RuleAction::BaseZone { attribute } => {
                select_base_zone(matches, attribute.as_deref(), base)
            }

            RuleAction::ZoneTable { values, .. } => {
                let Some(zone) = table.value(Field::BaseZone).and_then(FieldValue::as_text) else {
                    return Proposal::skip(SkipReason::DependencyUnavailable, "base zone is unavailable");
                };
                let zone = zone.trim().to_uppercase();
                let hit = values.get(&zone).map(|v| (zone.as_str(), v)).or_else(|| {
                    values
                        .iter()
                        .filter(|(key, _)| zone.starts_with(key.as_str()))
                        .max_by_key(|(key, _)| key.len())
                        .map(|(key, v)| (key.as_str(), v))
                });
                match hit {
                    Some((key, value)) => Proposal::set(
                        value.clone(),
                        table.source_matches(Field::BaseZone),
                        format!("{field} for zone {zone} via entry {key}"),
                    ),
                    None => Proposal::skip(
                        SkipReason::PreconditionUnmet,
                        format!("no {field} entry for zone {zone}"),
                    ),
                }
            }

            RuleAction::LayerAttribute {
                selector,
                attribute,
                effect,
                ..
            } => {
                let selected = match select(matches, selector) {
                    Ok(s) => s,
                    Err(skip) => return skip,
                };
                if selected.is_empty() {
                    return Proposal::skip(
                        SkipReason::PreconditionUnmet,
                        format!("no matching {} layer", selector.layer),
                    );
                }
                let readings: Vec<(&Match, FieldValue)> = selected
                    .iter()
                    .filter_map(|m| {
                        let raw = m.attribute(attribute)?;
                        FieldValue::parse_for(field.field_type(), &raw.to_string())
                            .ok()
                            .map(|v| (*m, v))
                    })
                    .collect();
                let Some((first, first_value)) = readings.first() else {
                    return Proposal::skip(
                        SkipReason::InsufficientData,
                        format!("attribute {attribute} absent from {} match(es)", selected.len()),
                    );
                };
                match effect {
                    Effect::Set => Proposal::set(
                        first_value.clone(),
                        vec![first.match_id().to_string()],
                        format!("{attribute} of {}", first.match_id()),
                    ),
                    Effect::Cap => {
                        let mut limit = first_value.clone();
                        for (_, v) in &readings[1..] {
                            if let Some(min) = limit.min_numeric(v) {
                                limit = min;
                            }
                        }
                        let used: Vec<&Match> = readings.iter().map(|(m, _)| *m).collect();
                        Proposal::with_effect(
                            Effect::Cap,
                            limit,
                            ids(&used),
                            format!("cap from {attribute}"),
                        )
                    }
                }
            }

            RuleAction::Constant {
                selector,
                value,
                effect,
                ..
            } => {
                let selected = match select(matches, selector) {
                    Ok(s) => s,
                    Err(skip) => return skip,
                };
                if selected.is_empty() {
                    return Proposal::skip(
                        SkipReason::PreconditionUnmet,
                        format!(
                            "no matching {} layer{}",
                            selector.layer,
                            selector
                                .designation
                                .as_deref()
                                .map(|d| format!(" designated {d}"))
                                .unwrap_or_default()
                        ),
                    );
                }
                Proposal::with_effect(
                    *effect,
                    value.clone(),
                    ids(&selected),
                    format!("{} {value}", effect.as_str()),
                )
            }

            RuleAction::Collect {
                selector,
                attribute,
                ..
            } => {
                let selected = match select(matches, selector) {
                    Ok(s) => s,
                    Err(skip) => return skip,
                };
                let mut names: Vec<String> = selected
                    .iter()
                    .filter_map(|m| match attribute {
                        Some(a) => m.attribute(a).map(|v| v.to_string()),
                        None => Some(m.designation().to_string()),
                    })
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                names.sort();
                names.dedup();
                let note = format!("{} {} layer(s)", names.len(), selector.layer);
                Proposal::set(FieldValue::List(names), ids(&selected), note)
            }

            RuleAction::Proximity {
                selector,
                category_attribute,
                ..
            } => {
                let selected = match select(matches, selector) {
                    Ok(s) => s,
                    Err(skip) => return skip,
                };
                let mut entries: Vec<ProximityEntry> = selected
                    .iter()
                    .map(|m| ProximityEntry {
                        distance_ft: distance_of(m),
                        designation: m.designation().to_string(),
                        category: m.attribute(category_attribute).map(|v| v.to_string()),
                    })
                    .collect();
                entries.sort();
                entries.dedup();
                let note = format!("{} stop(s) within buffer", entries.len());
                Proposal::set(FieldValue::Proximity(entries), ids(&selected), note)
            }

            RuleAction::TocTier {
                selector,
                tiers,
                eligible_zones,
                category_attribute,
            } => {
                if !eligible_zones.is_empty() {
                    let Some(zone) = table.value(Field::BaseZone).and_then(FieldValue::as_text) else {
                        return Proposal::skip(SkipReason::DependencyUnavailable, "base zone is unavailable");
                    };
                    let zone = zone.trim().to_uppercase();
                    if prefix_match(&zone, eligible_zones).is_none() {
                        return Proposal::set(
                            FieldValue::Tier(TocTier::None),
                            table.source_matches(Field::BaseZone),
                            format!("zone {zone} is not TOC eligible"),
                        );
                    }
                }
                let selected = match select(matches, selector) {
                    Ok(s) => s,
                    Err(skip) => return skip,
                };
                for threshold in tiers {
                    let qualifying = selected.iter().find(|m| {
                        let category_ok = threshold.stop_types.is_empty()
                            || m.attribute(category_attribute).is_some_and(|c| {
                                let c = c.to_string().trim().to_uppercase();
                                threshold.stop_types.contains(&c)
                            });
                        category_ok && distance_of(m) <= threshold.max_distance_ft
                    });
                    if let Some(stop) = qualifying {
                        return Proposal::set(
                            FieldValue::Tier(threshold.tier),
                            vec![stop.match_id().to_string()],
                            format!(
                                "{} within {} ft of {}",
                                threshold.tier,
                                threshold.max_distance_ft,
                                stop.designation()
                            ),
                        );
                    }
                }
                Proposal::set(
                    FieldValue::Tier(TocTier::None),
                    Vec::new(),
                    "no qualifying transit stop within any tier distance",
                )
            }

            RuleAction::DensityBonus {
                base_percent,
                eligible_zones,
                toc_percent,
            } => {
                let mut used = Vec::new();
                if !eligible_zones.is_empty() {
                    let Some(zone) = table.value(Field::BaseZone).and_then(FieldValue::as_text) else {
                        return Proposal::skip(SkipReason::DependencyUnavailable, "base zone is unavailable");
                    };
                    let zone = zone.trim().to_uppercase();
                    used.extend(table.source_matches(Field::BaseZone));
                    if prefix_match(&zone, eligible_zones).is_none() {
                        return Proposal::set(
                            FieldValue::Percent(0),
                            used,
                            format!("zone {zone} is not density bonus eligible"),
                        );
                    }
                }
                let toc = table
                    .value(Field::TocTier)
                    .and_then(FieldValue::as_tier)
                    .and_then(|tier| toc_percent.get(&tier).map(|p| (tier, *p)));
                match toc {
                    Some((tier, percent)) if percent > *base_percent => {
                        used.extend(table.source_matches(Field::TocTier));
                        Proposal::set(
                            FieldValue::Percent(percent),
                            used,
                            format!("TOC {tier} bonus {percent}%"),
                        )
                    }
                    _ => Proposal::set(
                        FieldValue::Percent(*base_percent),
                        used,
                        format!("statutory bonus {base_percent}%"),
                    ),
                }
            }

            RuleAction::TocIncentive {
                percent_by_tier, ..
            } => {
                let Some(tier) = table.value(Field::TocTier).and_then(FieldValue::as_tier) else {
                    return Proposal::skip(SkipReason::DependencyUnavailable, "TOC tier is unavailable");
                };
                match percent_by_tier.get(&tier).copied().filter(|p| *p > 0) {
                    Some(percent) => Proposal::Write {
                        op: Op::Raise(percent),
                        matches: table.source_matches(Field::TocTier),
                        note: format!("{tier} raises {field} by {percent}%"),
                    },
                    None => Proposal::skip(
                        SkipReason::PreconditionUnmet,
                        format!("no {field} incentive for {tier}"),
                    ),
                }
            }
        }
    }
}
