//! Per-kind search buffers and source ranks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use zoning_core::{LayerKind, Quantity, SourceId};

/// How the resolver searches and ranks each layer kind.
///
/// Part of the ruleset (`resolution:` block), so it is versioned with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionPolicy {
    /// Search buffer in feet. Kinds not listed use zero (intersection
    /// or touching only).
    #[serde(default)]
    pub buffers_ft: BTreeMap<LayerKind, Quantity>,
    /// Sources per kind, most authoritative first.
    #[serde(default)]
    pub source_ranks: BTreeMap<LayerKind, Vec<SourceId>>,
}

impl ResolutionPolicy {
    /// Search buffer for `kind`.
    pub fn buffer_ft(&self, kind: LayerKind) -> Quantity {
        self.buffers_ft.get(&kind).copied().unwrap_or(Quantity::ZERO)
    }

    /// Rank of `source` within `kind`: its list position, or one past the
    /// end for unlisted sources. Lower is more authoritative.
    pub fn source_rank(&self, kind: LayerKind, source: &SourceId) -> u32 {
        let listed = self.source_ranks.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let position = listed
            .iter()
            .position(|s| s == source)
            .unwrap_or(listed.len());
        u32::try_from(position).unwrap_or(u32::MAX)
    }
}
