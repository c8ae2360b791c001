//! # Provenance Trail
//!
//! One entry per (field, match or rule) pair that contributed to, or was
//! rejected for, a reported value. Every entry carries the layer snapshot
//! version so the trail alone identifies the data it was derived from.

use serde::Serialize;

use zoning_core::{RuleId, SnapshotVersion};
use zoning_rules::ContributionRole;

/// What the entry points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceSource {
    /// A match id (`kind/source/layer`).
    Match(String),
    /// A rule id.
    Rule(RuleId),
}

/// How the source relates to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceRole {
    /// Produced the reported value.
    Set,
    /// Capped the value.
    Cap,
    /// Raised the value.
    Raise,
    /// Produced a value later overridden.
    Overridden,
    /// Produced a contradicting value at equal precedence.
    ConflictCandidate,
    /// Contributed to an overlay entry.
    Overlay,
    /// A base zone match that lost the tie-break.
    Superseded,
}

impl ProvenanceRole {
    /// Whether the entry supports the reported value.
    pub fn supports_value(&self) -> bool {
        matches!(self, Self::Set | Self::Cap | Self::Raise | Self::Overlay)
    }
}

impl From<ContributionRole> for ProvenanceRole {
    fn from(role: ContributionRole) -> Self {
        match role {
            ContributionRole::Set => Self::Set,
            ContributionRole::Cap => Self::Cap,
            ContributionRole::Raise => Self::Raise,
            ContributionRole::Overridden => Self::Overridden,
            ContributionRole::ConflictCandidate => Self::ConflictCandidate,
        }
    }
}

/// One provenance entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceEntry {
    /// Field name, or `overlays[rank]`.
    pub field: String,
    /// Match or rule.
    #[serde(flatten)]
    pub source: ProvenanceSource,
    /// Layer snapshot the determination was built from.
    pub snapshot_version: SnapshotVersion,
    /// Relationship.
    pub role: ProvenanceRole,
}

/// Field label for an overlay entry.
pub fn overlay_field(rank: u32) -> String {
    format!("overlays[{rank}]")
}
