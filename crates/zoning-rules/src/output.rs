//! # Rule Engine Output
//!
//! [`RuleCoreOutput`] is the determination core: every field with its
//! value (or `unavailable`), the contributions that produced it, the
//! ordered overlay list, and the full rule trace. The Determination
//! Builder turns it into the published object.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use zoning_core::{LayerKind, RuleId};
use zoning_layers::AttributeValue;

use crate::evaluation::{RuleEvaluation, RuleState};
use crate::field::{Field, FieldValue};

/// How a contribution affected its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionRole {
    /// Set the reported value.
    Set,
    /// Lowered the value to a cap.
    Cap,
    /// Raised the value by a percentage.
    Raise,
    /// Was set, then overridden by a higher precedence rule.
    Overridden,
    /// A contradicting value at equal precedence; not reported.
    ConflictCandidate,
}

impl ContributionRole {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Cap => "cap",
            Self::Raise => "raise",
            Self::Overridden => "overridden",
            Self::ConflictCandidate => "conflict_candidate",
        }
    }

    /// Whether the contribution shaped the reported value.
    pub fn is_effective(&self) -> bool {
        matches!(self, Self::Set | Self::Cap | Self::Raise)
    }
}

/// One rule's effect on a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    /// Rule.
    pub rule_id: RuleId,
    /// Matches the rule read.
    pub matches: Vec<String>,
    /// Value the rule produced.
    pub value: FieldValue,
    /// Role.
    pub role: ContributionRole,
}

/// The rule (and matches) responsible for a reported value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSource {
    /// Rule.
    pub rule: RuleId,
    /// Matches.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,
}

/// A field after every rule has run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResolvedField {
    /// Reported value; absent when unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    /// Last effective contribution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<FieldSource>,
    /// Contradicting equal-precedence values exist.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub uncertain: bool,
    /// Every contribution in evaluation order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<Contribution>,
}

impl ResolvedField {
    /// No value could be determined.
    pub fn is_unavailable(&self) -> bool {
        self.value.is_none()
    }
}

/// One resolved overlay district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOverlay {
    /// 1-based precedence rank, unique within a determination.
    pub rank: u32,
    /// Overlay name as first seen.
    pub name: String,
    /// Every contributing match.
    pub sources: Vec<String>,
    /// Merged attributes. Capping attributes take the minimum, flags OR.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Attributes whose sources disagree with no merge rule, every
    /// distinct value in match order. These are absent from `attributes`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub conflicting_attributes: BTreeMap<String, Vec<AttributeValue>>,
}

/// Why a base zone match was not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupersededReason {
    /// Same predicate class, lower source priority.
    SupersededByPriority,
    /// Weaker predicate class.
    SupersededByRelation,
    /// Same class and source rank; lost on overlap weight or layer id.
    SupersededByTieBreak,
}

/// A base zone match that lost the tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupersededMatch {
    /// The losing match.
    pub match_id: String,
    /// Its zone code.
    pub designation: String,
    /// Why it lost.
    pub reason: SupersededReason,
    /// The match that won.
    pub authoritative: String,
}

/// Two base zone matches indistinguishable by class and rank that
/// disagree on the zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseZoneTie {
    /// Match chosen by the remaining ordering keys.
    pub chosen: String,
    /// Runner-up.
    pub runner_up: String,
}

/// Everything the Rule Engine produced for one parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCoreOutput {
    /// All fields, including unavailable ones.
    pub fields: BTreeMap<Field, ResolvedField>,
    /// Overlays in precedence order.
    pub overlays: Vec<ResolvedOverlay>,
    /// Overlay data was not loaded.
    pub overlays_unavailable: bool,
    /// Layer kinds that had no loaded data.
    pub unavailable_kinds: BTreeSet<LayerKind>,
    /// Non-authoritative base zone matches.
    pub superseded: Vec<SupersededMatch>,
    /// Base zone tie, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_zone_tie: Option<BaseZoneTie>,
    /// Every rule evaluation, in evaluation order.
    pub evaluations: Vec<RuleEvaluation>,
}

impl RuleCoreOutput {
    /// A field.
    pub fn field(&self, field: Field) -> Option<&ResolvedField> {
        self.fields.get(&field)
    }

    /// A field's reported value.
    pub fn value(&self, field: Field) -> Option<&FieldValue> {
        self.fields.get(&field).and_then(|f| f.value.as_ref())
    }

    /// Evaluation of a rule.
    pub fn evaluation(&self, rule: &RuleId) -> Option<&RuleEvaluation> {
        self.evaluations.iter().find(|e| &e.rule_id == rule)
    }

    /// Conflicting rules grouped by field. Each group lists the applied
    /// rule first, then the conflicted ones.
    pub fn conflicts(&self) -> BTreeMap<Field, Vec<RuleId>> {
        let mut out: BTreeMap<Field, Vec<RuleId>> = BTreeMap::new();
        for ev in &self.evaluations {
            if ev.state != RuleState::Conflicted {
                continue;
            }
            let rules = out.entry(ev.field).or_default();
            if let Some(with) = &ev.conflicts_with {
                if !rules.contains(with) {
                    rules.push(with.clone());
                }
            }
            if !rules.contains(&ev.rule_id) {
                rules.push(ev.rule_id.clone());
            }
        }
        out
    }
}
