//! # Rule Evaluation State Machine
//!
//! Every rule in a ruleset produces exactly one [`RuleEvaluation`] per
//! request. It starts `Pending` and moves once to a terminal state:
//!
//! ```text
//! Pending ──▶ Applied      rule fired and contributed its field
//!    │
//!    ├──────▶ Skipped      preconditions unmet (reason recorded)
//!    │
//!    └──────▶ Conflicted   contradicts an applied rule of equal precedence
//! ```
//!
//! Terminal states reject further transitions with
//! [`RuleEngineError::InvalidTransition`]. The transition log travels
//! into the determination's rule trace.

use std::fmt;

use serde::{Deserialize, Serialize};

use zoning_core::RuleId;

use crate::error::RuleEngineError;
use crate::field::{Field, FieldValue};
use crate::ruleset::{Phase, Rule};

// ─── States ──────────────────────────────────────────────────────────

/// Rule evaluation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleState {
    /// Not yet evaluated.
    Pending,
    /// Fired and contributed a field.
    Applied,
    /// Preconditions unmet.
    Skipped,
    /// Contradicts an applied rule of equal precedence.
    Conflicted,
}

impl RuleState {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::Conflicted => "conflicted",
        }
    }

    /// Whether no further transitions are allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a rule was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No matching layer, or the rule's condition does not hold.
    PreconditionUnmet,
    /// The layer kind the rule reads has no loaded data.
    LayerUnavailable,
    /// A required layer attribute is absent from every match.
    InsufficientData,
    /// A field the rule reads is unavailable.
    DependencyUnavailable,
    /// The parcel's jurisdiction is outside the rule's filter.
    NotApplicable,
}

impl SkipReason {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreconditionUnmet => "precondition_unmet",
            Self::LayerUnavailable => "layer_unavailable",
            Self::InsufficientData => "insufficient_data",
            Self::DependencyUnavailable => "dependency_unavailable",
            Self::NotApplicable => "not_applicable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTransition {
    /// State before.
    pub from: RuleState,
    /// State after.
    pub to: RuleState,
    /// Human-readable reason.
    pub reason: String,
}

// ─── Evaluation ──────────────────────────────────────────────────────

/// The outcome of evaluating one rule for one parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleEvaluation {
    /// Rule id.
    pub rule_id: RuleId,
    /// Rule kind.
    pub kind: &'static str,
    /// Phase.
    pub phase: Phase,
    /// Tier.
    pub tier: u16,
    /// Priority.
    pub priority: u32,
    /// Target field.
    pub field: Field,
    /// Current state.
    pub state: RuleState,
    /// Set when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    /// Value the rule produced (applied or conflicted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    /// Matches the rule read.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<String>,
    /// The applied rule this one contradicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicts_with: Option<RuleId>,
    /// Transition log.
    pub transitions: Vec<RuleTransition>,
}

impl RuleEvaluation {
    /// A fresh evaluation in `Pending`.
    pub fn pending(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            kind: rule.action.kind_name(),
            phase: rule.phase(),
            tier: rule.tier,
            priority: rule.priority,
            field: rule.action.field(),
            state: RuleState::Pending,
            skip_reason: None,
            value: None,
            matches: Vec::new(),
            conflicts_with: None,
            transitions: Vec::new(),
        }
    }

    /// Pending → Applied.
    pub fn apply(
        &mut self,
        value: FieldValue,
        matches: Vec<String>,
        reason: &str,
    ) -> Result<(), RuleEngineError> {
        self.require_state(RuleState::Pending, RuleState::Applied)?;
        self.value = Some(value);
        self.matches = matches;
        self.do_transition(RuleState::Applied, reason);
        Ok(())
    }

    /// Pending → Skipped.
    pub fn skip(&mut self, reason: SkipReason, detail: &str) -> Result<(), RuleEngineError> {
        self.require_state(RuleState::Pending, RuleState::Skipped)?;
        self.skip_reason = Some(reason);
        self.do_transition(RuleState::Skipped, &format!("{reason}: {detail}"));
        Ok(())
    }

    /// Pending → Conflicted.
    pub fn conflict(
        &mut self,
        value: FieldValue,
        matches: Vec<String>,
        with: RuleId,
    ) -> Result<(), RuleEngineError> {
        self.require_state(RuleState::Pending, RuleState::Conflicted)?;
        let reason = format!("contradicts {with} at equal precedence");
        self.value = Some(value);
        self.matches = matches;
        self.conflicts_with = Some(with);
        self.do_transition(RuleState::Conflicted, &reason);
        Ok(())
    }

    fn require_state(&self, expected: RuleState, target: RuleState) -> Result<(), RuleEngineError> {
        if self.state != expected {
            return Err(RuleEngineError::InvalidTransition {
                rule: self.rule_id.clone(),
                from: self.state,
                to: target,
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: RuleState, reason: &str) {
        self.transitions.push(RuleTransition {
            from: self.state,
            to,
            reason: reason.to_string(),
        });
        self.state = to;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruleset::RuleAction;

    fn rule() -> Rule {
        Rule {
            id: RuleId::new("base").unwrap(),
            description: None,
            tier: 0,
            priority: 1,
            jurisdictions: vec![],
            action: RuleAction::BaseZone { attribute: None },
        }
    }

    #[test]
    fn pending_to_applied_records_transition() {
        let mut ev = RuleEvaluation::pending(&rule());
        assert_eq!(ev.state, RuleState::Pending);
        ev.apply(FieldValue::Text("R1".into()), vec!["m".into()], "selected")
            .unwrap();
        assert_eq!(ev.state, RuleState::Applied);
        assert_eq!(ev.transitions.len(), 1);
        assert_eq!(ev.transitions[0].from, RuleState::Pending);
        assert_eq!(ev.transitions[0].to, RuleState::Applied);
    }

    #[test]
    fn terminal_states_cannot_transition() {
        let mut ev = RuleEvaluation::pending(&rule());
        ev.skip(SkipReason::InsufficientData, "no zone attribute")
            .unwrap();
        let err = ev
            .apply(FieldValue::Text("R1".into()), vec![], "late")
            .unwrap_err();
        assert!(matches!(
            err,
            RuleEngineError::InvalidTransition {
                from: RuleState::Skipped,
                to: RuleState::Applied,
                ..
            }
        ));
        assert_eq!(ev.transitions.len(), 1);
        assert_eq!(ev.skip_reason, Some(SkipReason::InsufficientData));
    }

    #[test]
    fn conflict_records_the_other_rule() {
        let mut ev = RuleEvaluation::pending(&rule());
        let other = RuleId::new("other").unwrap();
        ev.conflict(FieldValue::Text("C2".into()), vec![], other.clone())
            .unwrap();
        assert_eq!(ev.state, RuleState::Conflicted);
        assert_eq!(ev.conflicts_with, Some(other));
        assert!(ev.transitions[0].reason.contains("other"));
        assert!(ev.skip(SkipReason::NotApplicable, "x").is_err());
    }

    #[test]
    fn states_serialize_snake_case() {
        assert_eq!(serde_json::to_string(&RuleState::Conflicted).unwrap(), "\"conflicted\"");
        assert_eq!(
            serde_json::to_string(&SkipReason::DependencyUnavailable).unwrap(),
            "\"dependency_unavailable\""
        );
        assert!(RuleState::Applied.is_terminal());
        assert!(!RuleState::Pending.is_terminal());
    }
}
