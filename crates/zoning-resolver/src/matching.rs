//! # Matches
//!
//! A [`Match`] associates the parcel with one regulatory layer: how they
//! relate spatially, how relevant the layer is, and how authoritative its
//! source is. [`MatchSet`] holds every match for one request in a total,
//! input-order-independent order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use zoning_core::{
    ContentDigest, LayerId, LayerKind, Quantity, RelevanceWeight, SnapshotVersion, SourceId,
};
use zoning_layers::{AttributeValue, RegulatoryLayer};

/// Spatial predicate class, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionKind {
    /// The layer covers the whole parcel.
    Contains,
    /// The layer covers part of the parcel.
    Overlaps,
    /// The layer lies outside the parcel but within the search buffer.
    AdjacentWithinBuffer,
}

impl IntersectionKind {
    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Overlaps => "overlaps",
            Self::AdjacentWithinBuffer => "adjacent_within_buffer",
        }
    }

    /// True for classes that put the parcel inside the layer, at least
    /// in part.
    pub fn is_intersecting(&self) -> bool {
        matches!(self, Self::Contains | Self::Overlaps)
    }
}

impl fmt::Display for IntersectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parcel-layer association.
#[derive(Debug, Clone)]
pub struct Match {
    match_id: String,
    layer: Arc<RegulatoryLayer>,
    intersection: IntersectionKind,
    weight: RelevanceWeight,
    distance_ft: Option<Quantity>,
    source_rank: u32,
    geometry_digest: ContentDigest,
}

impl Match {
    pub(crate) fn new(
        layer: Arc<RegulatoryLayer>,
        intersection: IntersectionKind,
        weight: RelevanceWeight,
        distance_ft: Option<Quantity>,
        source_rank: u32,
        geometry_digest: ContentDigest,
    ) -> Self {
        Self {
            match_id: format!("{}/{}/{}", layer.kind, layer.source_id, layer.layer_id),
            layer,
            intersection,
            weight,
            distance_ft,
            source_rank,
            geometry_digest,
        }
    }

    /// Stable id, `kind/source/layer`.
    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// The matched layer.
    pub fn layer(&self) -> &RegulatoryLayer {
        &self.layer
    }

    /// Layer kind.
    pub fn kind(&self) -> LayerKind {
        self.layer.kind
    }

    /// Layer designation (zone code, overlay name).
    pub fn designation(&self) -> &str {
        &self.layer.designation
    }

    /// Source dataset.
    pub fn source_id(&self) -> &SourceId {
        &self.layer.source_id
    }

    /// Layer id.
    pub fn layer_id(&self) -> &LayerId {
        &self.layer.layer_id
    }

    /// Spatial predicate class.
    pub fn intersection(&self) -> IntersectionKind {
        self.intersection
    }

    /// Relevance weight.
    pub fn weight(&self) -> RelevanceWeight {
        self.weight
    }

    /// Distance for buffer-adjacent matches.
    pub fn distance_ft(&self) -> Option<Quantity> {
        self.distance_ft
    }

    /// Source rank within the kind (lower is more authoritative).
    pub fn source_rank(&self) -> u32 {
        self.source_rank
    }

    /// Digest of the layer's quantized geometry.
    pub fn geometry_digest(&self) -> &ContentDigest {
        &self.geometry_digest
    }

    /// Attribute lookup on the matched layer.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.layer.attribute(name)
    }

    /// Total order key: kind, predicate class, source rank, weight
    /// (descending), source id, layer id.
    #[allow(clippy::type_complexity)]
    fn order_key(
        &self,
    ) -> (LayerKind, IntersectionKind, u32, Reverse<RelevanceWeight>, &SourceId, &LayerId) {
        (
            self.layer.kind,
            self.intersection,
            self.source_rank,
            Reverse(self.weight),
            &self.layer.source_id,
            &self.layer.layer_id,
        )
    }

    /// Serializable form for the determination.
    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            match_id: self.match_id.clone(),
            kind: self.layer.kind,
            layer_id: self.layer.layer_id.clone(),
            source_id: self.layer.source_id.clone(),
            designation: self.layer.designation.clone(),
            intersection: self.intersection,
            weight: self.weight,
            distance_ft: self.distance_ft,
            source_rank: self.source_rank,
            geometry_digest: self.geometry_digest.clone(),
            effective_from: self.layer.effective.effective_from(),
            effective_until: self.layer.effective.effective_until(),
            attributes: self.layer.attributes.clone(),
        }
    }
}

/// Serialized match, as listed in a determination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// `kind/source/layer`.
    pub match_id: String,
    /// Layer kind.
    pub kind: LayerKind,
    /// Layer id.
    pub layer_id: LayerId,
    /// Source dataset.
    pub source_id: SourceId,
    /// Zone code or overlay/constraint name.
    pub designation: String,
    /// Spatial predicate class.
    pub intersection: IntersectionKind,
    /// Relevance weight in basis points.
    pub weight: RelevanceWeight,
    /// Distance for buffer-adjacent matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_ft: Option<Quantity>,
    /// Source rank within the kind.
    pub source_rank: u32,
    /// Digest of the layer's quantized geometry.
    pub geometry_digest: ContentDigest,
    /// First day in force.
    pub effective_from: NaiveDate,
    /// First day no longer in force.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<NaiveDate>,
    /// Layer attributes as loaded.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Every match for one request.
#[derive(Debug, Clone)]
pub struct MatchSet {
    snapshot_version: SnapshotVersion,
    as_of: NaiveDate,
    matches: Vec<Match>,
    unavailable: BTreeSet<LayerKind>,
}

impl MatchSet {
    /// Assemble and sort.
    pub fn new(
        snapshot_version: SnapshotVersion,
        as_of: NaiveDate,
        mut matches: Vec<Match>,
        unavailable: BTreeSet<LayerKind>,
    ) -> Self {
        matches.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Self {
            snapshot_version,
            as_of,
            matches,
            unavailable,
        }
    }

    /// Snapshot the matches came from.
    pub fn snapshot_version(&self) -> &SnapshotVersion {
        &self.snapshot_version
    }

    /// Date the layers were filtered on.
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// All matches, in total order.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Matches of one kind, in total order.
    pub fn of_kind(&self, kind: LayerKind) -> impl Iterator<Item = &Match> + '_ {
        self.matches.iter().filter(move |m| m.kind() == kind)
    }

    /// Find a match by id.
    pub fn get(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.match_id() == match_id)
    }

    /// Kinds the snapshot had no data for.
    pub fn unavailable(&self) -> &BTreeSet<LayerKind> {
        &self.unavailable
    }

    /// True if `kind` had no loaded data.
    pub fn is_unavailable(&self, kind: LayerKind) -> bool {
        self.unavailable.contains(&kind)
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// True if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Serializable records, in total order.
    pub fn records(&self) -> Vec<MatchRecord> {
        self.matches.iter().map(Match::to_record).collect()
    }
}
