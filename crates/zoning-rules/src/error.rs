//! Rule Engine error types.
//!
//! [`RuleConfigError`] is load-time only: a ruleset that fails validation
//! never reaches request processing. Per-request data gaps are not errors;
//! they are recorded as `Skipped` rule evaluations.

use thiserror::Error;

use zoning_core::{CanonicalizationError, LayerKind, Quantity, RuleId};
use zoning_schema::{DocumentError, SchemaValidationError};

use crate::evaluation::RuleState;
use crate::field::{Field, TocTier};

/// A semantically invalid ruleset.
#[derive(Error, Debug)]
pub enum RuleConfigError {
    /// The version label is empty or malformed.
    #[error("invalid ruleset version: {reason}")]
    InvalidVersion {
        /// Validation detail.
        reason: String,
    },

    /// Two rules share an id.
    #[error("duplicate rule id {id}")]
    DuplicateRuleId {
        /// Repeated id.
        id: RuleId,
    },

    /// Two rules share `(tier, priority)`. Evaluation order would be
    /// undefined, so this is rejected rather than resolved at runtime.
    #[error("rules {first} and {second} both have tier {tier} priority {priority}")]
    DuplicatePrecedence {
        /// Shared tier.
        tier: u16,
        /// Shared priority.
        priority: u32,
        /// First rule.
        first: RuleId,
        /// Second rule.
        second: RuleId,
    },

    /// More than one `base_zone` rule.
    #[error("only one base_zone rule is allowed ({first} and {second})")]
    MultipleBaseZoneRules {
        /// First rule.
        first: RuleId,
        /// Second rule.
        second: RuleId,
    },

    /// The rule kind cannot produce this field.
    #[error("rule {rule} of kind {kind} cannot produce field {field}")]
    FieldTypeMismatch {
        /// Offending rule.
        rule: RuleId,
        /// Rule kind.
        kind: &'static str,
        /// Target field.
        field: Field,
    },

    /// `cap` or a percentage raise on a non-numeric field.
    #[error("rule {rule} applies {effect} to non-numeric field {field}")]
    NonNumericEffect {
        /// Offending rule.
        rule: RuleId,
        /// Effect name.
        effect: &'static str,
        /// Target field.
        field: Field,
    },

    /// A literal in the rule does not parse for its field.
    #[error("rule {rule}: invalid value for {key}: {reason}")]
    InvalidValue {
        /// Offending rule.
        rule: RuleId,
        /// Table key or `value`.
        key: String,
        /// Parse failure.
        reason: String,
    },

    /// A TOC tier threshold outside 1..=4.
    #[error("rule {rule}: TOC tier {tier} is outside 1..=4")]
    InvalidTocTier {
        /// Offending rule.
        rule: RuleId,
        /// Tier number.
        tier: u8,
    },

    /// A TOC tier threshold listed twice.
    #[error("rule {rule}: TOC tier {tier} is listed more than once")]
    DuplicateTocTier {
        /// Offending rule.
        rule: RuleId,
        /// Tier number.
        tier: u8,
    },

    /// A TOC tier reaches farther than the resolver searches for its
    /// layer kind, so qualifying stops would never be seen.
    #[error("rule {rule}: {tier} reaches {distance} ft but the {kind} buffer is {buffer} ft")]
    TierBeyondBuffer {
        /// Offending rule.
        rule: RuleId,
        /// Tier granted by the threshold.
        tier: TocTier,
        /// Layer kind searched.
        kind: LayerKind,
        /// Threshold distance.
        distance: Quantity,
        /// Configured search buffer.
        buffer: Quantity,
    },

    /// A search buffer below zero.
    #[error("negative search buffer {buffer} ft for {kind}")]
    NegativeBuffer {
        /// Layer kind.
        kind: LayerKind,
        /// Configured buffer.
        buffer: Quantity,
    },

    /// An overlay listed twice in `overlay_precedence` (case-insensitive).
    #[error("overlay {name:?} appears more than once in overlay_precedence")]
    DuplicateOverlayPrecedence {
        /// Repeated name.
        name: String,
    },

    /// A rule reads a field that no earlier rule produces.
    #[error("rule {rule} reads {field}, which no earlier rule produces")]
    UnresolvedDependency {
        /// Offending rule.
        rule: RuleId,
        /// Field read.
        field: Field,
    },

    /// The compiled ruleset could not be canonicalized for its digest.
    #[error("ruleset digest failed: {0}")]
    Digest(#[from] CanonicalizationError),
}

/// Errors loading a ruleset document.
#[derive(Error, Debug)]
pub enum RulesetError {
    /// The file could not be read or parsed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The document does not conform to the ruleset schema.
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),

    /// A value failed typed parsing.
    #[error("invalid ruleset {origin}: {source}")]
    Decode {
        /// Origin label.
        origin: String,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The ruleset is semantically invalid.
    #[error(transparent)]
    Config(#[from] RuleConfigError),
}

/// Internal consistency failures during rule application.
#[derive(Error, Debug)]
pub enum RuleEngineError {
    /// A rule evaluation was driven out of its state machine.
    #[error("rule {rule} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Rule id.
        rule: RuleId,
        /// Current state.
        from: RuleState,
        /// Attempted state.
        to: RuleState,
    },
}
