//! # Layer Kind
//!
//! The five categories of regulatory layer the engine knows about. This is
//! the one definition used by the store, resolver and rule engine, so an
//! added kind is a compile error everywhere it is not handled.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category of a regulatory layer.
///
/// | Kind | Examples |
/// |------|----------|
/// | BaseZone | Z-NET zoning polygons (`R1`, `C2-1`, `A1`) |
/// | Overlay | Hillside, HPOZ, CDO, RFA, specific plans |
/// | Environmental | Liquefaction, flood, coastal zone, biological resource |
/// | TransitProximity | Major transit stops, high-quality transit corridors |
/// | HazardZone | VHFHSZ fire, Alquist-Priolo fault, airport hazard, WUI |
///
/// The declaration order is the canonical order used when sorting matches
/// and layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Base zoning district.
    BaseZone,
    /// Overlay district modifying base-zone rights.
    Overlay,
    /// Environmental constraint area.
    Environmental,
    /// Transit stop or corridor used for proximity programs.
    TransitProximity,
    /// Natural or man-made hazard area.
    HazardZone,
}

/// Number of layer kinds.
pub const LAYER_KIND_COUNT: usize = 5;

impl LayerKind {
    /// All kinds in canonical order.
    pub fn all() -> &'static [LayerKind; LAYER_KIND_COUNT] {
        &[
            Self::BaseZone,
            Self::Overlay,
            Self::Environmental,
            Self::TransitProximity,
            Self::HazardZone,
        ]
    }

    /// The snake_case name used in feeds, rulesets and determinations.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseZone => "base_zone",
            Self::Overlay => "overlay",
            Self::Environmental => "environmental",
            Self::TransitProximity => "transit_proximity",
            Self::HazardZone => "hazard_zone",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a layer kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown layer kind {0:?}")]
pub struct UnknownLayerKind(pub String);

impl FromStr for LayerKind {
    type Err = UnknownLayerKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownLayerKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_has_declared_count_and_is_sorted() {
        let all = LayerKind::all();
        assert_eq!(all.len(), LAYER_KIND_COUNT);
        let mut sorted = all.to_vec();
        sorted.sort();
        assert_eq!(sorted.as_slice(), all.as_slice());
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in LayerKind::all() {
            assert_eq!(kind.as_str().parse::<LayerKind>().unwrap(), *kind);
        }
        assert!("zoning".parse::<LayerKind>().is_err());
    }

    #[test]
    fn serde_name_matches_as_str() {
        for kind in LayerKind::all() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
