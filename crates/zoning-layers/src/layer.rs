//! # Regulatory Layer
//!
//! A typed entry from one geographic dataset: a zone polygon, an overlay
//! district, an environmental constraint, a transit stop, a hazard zone.
//! Loaded by external ETL and read-only to the engine.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use zoning_core::{EffectiveRange, Geometry, LayerId, LayerKind, SourceId};

use crate::attribute::AttributeValue;

/// A regulatory layer record.
///
/// Attribute names are case-folded to lowercase at snapshot build, so
/// `ZONE_CMPLT` and `zone_cmplt` address the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryLayer {
    /// Unique within a snapshot.
    pub layer_id: LayerId,
    /// Layer kind.
    pub kind: LayerKind,
    /// Dataset the record came from (`znet`, `zimas`, `metro_stops`).
    pub source_id: SourceId,
    /// Zone code or overlay/constraint name (`R1`, `Hillside`).
    pub designation: String,
    /// Spatial extent.
    pub geometry: Geometry,
    /// Flat attribute map.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Dates the record is in force.
    #[serde(flatten)]
    pub effective: EffectiveRange,
}

impl RegulatoryLayer {
    /// Look up an attribute by case-insensitive name. Blank text counts as
    /// absent.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        let value = match self.attributes.get(name) {
            Some(v) => Some(v),
            None => self.attributes.get(&name.to_ascii_lowercase()),
        };
        value.filter(|v| !v.is_blank())
    }

    /// True when the record is in force on `as_of`.
    pub fn is_effective(&self, as_of: NaiveDate) -> bool {
        self.effective.covers(as_of)
    }
}
