//! # Overlay Resolver
//!
//! `resolve(parcel, asOf) → MatchSet`. Queries the snapshot once per layer
//! kind with that kind's search buffer, classifies each candidate layer
//! against the parcel geometry and assigns a relevance weight:
//!
//! | Class | Weight (basis points) |
//! |-------|-----------------------|
//! | contains | 10000 |
//! | overlaps | share of parcel area covered, 1..=9999 |
//! | adjacent within buffer | `5000 × (1 − d / buffer)`, 5000 at zero buffer |

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use zoning_core::{LayerKind, Quantity, RelevanceWeight, SpatialRelation};
use zoning_layers::{LayerSnapshot, LayerStoreError, RegulatoryLayer};
use zoning_locator::Parcel;

use crate::error::ResolverError;
use crate::matching::{IntersectionKind, Match, MatchSet};
use crate::policy::ResolutionPolicy;

/// Ceiling for buffer-adjacency weights.
const ADJACENT_MAX_WEIGHT_BP: i64 = 5_000;

/// Matches parcels against a layer snapshot.
#[derive(Debug, Clone, Default)]
pub struct OverlayResolver {
    policy: ResolutionPolicy,
}

impl OverlayResolver {
    /// Resolve with `policy`.
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// Every match for `parcel` in `snapshot` as of `as_of`.
    ///
    /// A kind with no loaded data is recorded as unavailable rather than
    /// failing the request.
    pub fn resolve(
        &self,
        snapshot: &LayerSnapshot,
        parcel: &Parcel,
        as_of: NaiveDate,
    ) -> Result<MatchSet, ResolverError> {
        let mut matches = Vec::new();
        let mut unavailable = BTreeSet::new();

        for &kind in LayerKind::all() {
            let buffer = self.policy.buffer_ft(kind);
            let candidates = match snapshot.layers_intersecting(
                parcel.geometry(),
                as_of,
                kind,
                buffer.as_f64(),
            ) {
                Ok(layers) => layers,
                Err(LayerStoreError::LayerUnavailable { .. }) => {
                    tracing::warn!(
                        kind = %kind,
                        snapshot = %snapshot.version(),
                        apn = %parcel.apn(),
                        "layer kind unavailable; continuing with partial data"
                    );
                    unavailable.insert(kind);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            for layer in candidates {
                if let Some(m) = self.classify(parcel, layer, buffer)? {
                    matches.push(m);
                }
            }
        }

        let set = MatchSet::new(snapshot.version().clone(), as_of, matches, unavailable);
        tracing::debug!(
            apn = %parcel.apn(),
            snapshot = %snapshot.version(),
            matches = set.len(),
            unavailable = set.unavailable().len(),
            "overlay resolution complete"
        );
        Ok(set)
    }

    fn classify(
        &self,
        parcel: &Parcel,
        layer: Arc<RegulatoryLayer>,
        buffer: Quantity,
    ) -> Result<Option<Match>, ResolverError> {
        let Some(relation) = parcel.geometry().relate(&layer.geometry, buffer.as_f64()) else {
            return Ok(None);
        };
        let (intersection, weight, distance_ft) = match relation {
            SpatialRelation::Contains => (IntersectionKind::Contains, RelevanceWeight::FULL, None),
            SpatialRelation::Overlaps { covered } => (IntersectionKind::Overlaps, covered, None),
            SpatialRelation::Adjacent { distance_ft } => (
                IntersectionKind::AdjacentWithinBuffer,
                adjacency_weight(distance_ft, buffer),
                Some(distance_ft),
            ),
        };
        let source_rank = self.policy.source_rank(layer.kind, &layer.source_id);
        let geometry_digest = layer
            .geometry
            .digest()
            .map_err(|source| ResolverError::Digest {
                layer_id: layer.layer_id.to_string(),
                source,
            })?;
        Ok(Some(Match::new(
            layer,
            intersection,
            weight,
            distance_ft,
            source_rank,
            geometry_digest,
        )))
    }
}

/// `5000 × (1 − d / buffer)` in integer arithmetic.
fn adjacency_weight(distance: Quantity, buffer: Quantity) -> RelevanceWeight {
    let b = buffer.hundredths();
    if b <= 0 {
        return RelevanceWeight::from_basis_points(ADJACENT_MAX_WEIGHT_BP as u32);
    }
    let remaining = (b - distance.hundredths()).clamp(0, b);
    let bp = ADJACENT_MAX_WEIGHT_BP * remaining / b;
    RelevanceWeight::from_basis_points(u32::try_from(bp).unwrap_or(0))
}
