//! Determination warnings.
//!
//! Warnings annotate a determination that was still produced. A
//! determination with any `layer_unavailable` or `field_unavailable`
//! warning is `partial`.

use serde::Serialize;

use zoning_core::{LayerKind, RuleId};
use zoning_rules::{Field, SkipReason};

/// A non-fatal condition attached to a determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum Warning {
    /// A layer kind had no loaded data.
    LayerUnavailable {
        /// The layer kind.
        kind: LayerKind,
    },
    /// A field could not be determined.
    FieldUnavailable {
        /// The field.
        field: Field,
        /// Why the last rule for it was skipped, when one exists.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<SkipReason>,
    },
    /// Equal-precedence rules produced different values.
    ConflictingRules {
        /// Contested field.
        field: Field,
        /// Applied rule first, then the conflicting ones.
        rules: Vec<RuleId>,
    },
    /// Two base zone matches of equal class and source rank disagree.
    BaseZoneTie {
        /// Match chosen.
        chosen: String,
        /// Runner-up.
        runner_up: String,
    },
    /// The assessor's zoning string does not contain the resolved zone.
    AssessorZoningMismatch {
        /// Assessor `ZoningPDB` value.
        assessor: String,
        /// Resolved base zone.
        resolved: String,
    },
}

impl Warning {
    /// Whether the warning makes the determination partial.
    pub fn marks_partial(&self) -> bool {
        matches!(self, Self::LayerUnavailable { .. } | Self::FieldUnavailable { .. })
    }
}

/// Assessor zoning strings prefix a jurisdiction code (`LAR1`, `LCA1*`).
/// A mismatch is reported when the resolved code does not appear in it.
pub fn assessor_mismatch(assessor: &str, resolved: &str) -> Option<Warning> {
    let normalized: String = assessor
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let zone = resolved.trim().to_uppercase();
    if normalized.is_empty() || zone.is_empty() || normalized.contains(&zone) {
        return None;
    }
    Some(Warning::AssessorZoningMismatch {
        assessor: assessor.to_string(),
        resolved: resolved.to_string(),
    })
}
