//! # Determination
//!
//! The published output object. It is immutable once built and
//! identified by `determination_id`, the SHA-256 of the canonical body.
//! One determination exists per (parcel, `asOf`, ruleset version, layer
//! snapshot version); resolving the same inputs again yields the same
//! bytes and the same id.

use chrono::NaiveDate;
use serde::Serialize;

use zoning_core::{Apn, ContentDigest, Jurisdiction, RulesetVersion, SnapshotVersion};
use zoning_resolver::MatchRecord;
use zoning_rules::{
    FieldSource, FieldValue, ResolvedField, ResolvedOverlay, RuleEvaluation, SupersededMatch,
};

use crate::provenance::ProvenanceEntry;
use crate::warning::Warning;

/// Parcel identity as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelSummary {
    /// APN, dashed.
    pub apn: Apn,
    /// Normalized situs address.
    pub address: String,
    /// Jurisdiction tag.
    pub jurisdiction: Jurisdiction,
    /// Assessor use description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    /// Assessor zoning string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessor_zoning: Option<String>,
    /// Digest of the quantized parcel geometry.
    pub geometry_digest: ContentDigest,
}

/// A reported field: value and source, or the `unavailable` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedField {
    /// Value, absent when unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
    /// Rule and matches behind the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<FieldSource>,
    /// Equal-precedence rules disagree.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub uncertain: bool,
    /// No value could be determined.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unavailable: bool,
}

impl ReportedField {
    /// Whether the field is unavailable.
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }
}

impl From<&ResolvedField> for ReportedField {
    fn from(field: &ResolvedField) -> Self {
        Self {
            value: field.value.clone(),
            source: field.source.clone(),
            uncertain: field.uncertain,
            unavailable: field.is_unavailable(),
        }
    }
}

/// Derived development rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibilities {
    /// Density bonus percentage.
    pub density_bonus: ReportedField,
    /// TOC tier.
    pub toc_tier: ReportedField,
    /// Maximum height in feet.
    pub max_height: ReportedField,
    /// Maximum floor-area ratio.
    pub max_far: ReportedField,
}

/// Everything covered by the determination id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeterminationBody {
    /// Any field or layer kind is unavailable.
    pub partial: bool,
    /// Parcel identity.
    pub parcel: ParcelSummary,
    /// Evaluation date.
    pub as_of: NaiveDate,
    /// Ruleset version.
    pub ruleset_version: RulesetVersion,
    /// Ruleset digest.
    pub ruleset_digest: ContentDigest,
    /// Layer snapshot version.
    pub layer_snapshot_version: SnapshotVersion,
    /// Authoritative base zone.
    pub base_zone: ReportedField,
    /// Zone category.
    pub zone_category: ReportedField,
    /// Overlays in precedence order.
    pub overlays: Vec<ResolvedOverlay>,
    /// Derived eligibilities.
    pub eligibilities: Eligibilities,
    /// Environmental constraints.
    pub environmental: ReportedField,
    /// Hazard zones.
    pub hazards: ReportedField,
    /// Nearby transit.
    pub transit_access: ReportedField,
    /// Every match consulted, in resolver order.
    pub matches: Vec<MatchRecord>,
    /// Base zone matches that lost the tie-break.
    pub superseded: Vec<SupersededMatch>,
    /// Every rule evaluation.
    pub rule_trace: Vec<RuleEvaluation>,
    /// Provenance trail.
    pub provenance: Vec<ProvenanceEntry>,
    /// Non-fatal conditions.
    pub warnings: Vec<Warning>,
}

/// A built determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Determination {
    determination_id: ContentDigest,
    #[serde(flatten)]
    body: DeterminationBody,
}

impl Determination {
    pub(crate) fn new(determination_id: ContentDigest, body: DeterminationBody) -> Self {
        Self {
            determination_id,
            body,
        }
    }

    /// Content digest of the body.
    pub fn id(&self) -> &ContentDigest {
        &self.determination_id
    }

    /// The body.
    pub fn body(&self) -> &DeterminationBody {
        &self.body
    }

    /// Whether the determination is partial.
    pub fn is_partial(&self) -> bool {
        self.body.partial
    }

    /// Pretty JSON for operators and the summarizer.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
