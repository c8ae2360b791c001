//! # zoning-rules: Rule Engine
//!
//! Turns a parcel's [`MatchSet`](zoning_resolver::MatchSet) into the
//! determination core: the authoritative base zone, the ordered overlay
//! list, and derived fields (height, FAR, density bonus, TOC tier).
//!
//! - [`ruleset`]: the versioned ruleset document, its load-time
//!   validation ([`RuleConfigError`]) and the compiled [`Ruleset`].
//! - [`evaluation`]: the per-rule state machine
//!   (`Pending → Applied | Skipped | Conflicted`).
//! - [`engine`]: [`RuleEngine::apply`], which evaluates rules in order
//!   and resolves overrides, caps and conflicts.
//! - [`overlay`]: overlay merging and total ordering.
//!
//! A bad ruleset fails at load. Per-parcel data gaps never fail; they
//! surface as skipped evaluations and unavailable fields.

pub mod engine;
pub mod error;
pub mod evaluation;
pub mod field;
pub mod output;
pub mod overlay;
pub mod ruleset;

pub use engine::RuleEngine;
pub use error::{RuleConfigError, RuleEngineError, RulesetError};
pub use evaluation::{RuleEvaluation, RuleState, RuleTransition, SkipReason};
pub use field::{Field, FieldType, FieldValue, ProximityEntry, TocTier, FIELD_COUNT};
pub use output::{
    BaseZoneTie, Contribution, ContributionRole, FieldSource, ResolvedField, ResolvedOverlay,
    RuleCoreOutput, SupersededMatch, SupersededReason,
};
pub use overlay::resolve_overlays;
pub use ruleset::{
    ActionDocument, Effect, Phase, Precedence, Rule, RuleAction, RuleDocument, Ruleset,
    RulesetDocument, Selector, TierDocument, TierThreshold,
};
