//! # Determination Fields
//!
//! The fixed set of fields the Rule Engine can produce, their value types,
//! and the TOC tier scale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use zoning_core::Quantity;

// ─── Field ───────────────────────────────────────────────────────────

/// A reported determination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Authoritative base zone code.
    BaseZone,
    /// Zone category (Z-NET `Z_CATEGORY`).
    ZoneCategory,
    /// Maximum height in feet.
    MaxHeight,
    /// Maximum floor-area ratio.
    MaxFar,
    /// Density bonus percentage.
    DensityBonus,
    /// Transit Oriented Communities tier.
    TocTier,
    /// Environmental constraints.
    Environmental,
    /// Hazard zones.
    Hazards,
    /// Nearby transit.
    TransitAccess,
}

/// Number of fields.
pub const FIELD_COUNT: usize = 9;

/// Value shape a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text.
    Text,
    /// Fixed-point decimal.
    Quantity,
    /// Whole-number percentage.
    Percent,
    /// TOC tier.
    Tier,
    /// Sorted list of names.
    List,
    /// Sorted proximity entries.
    Proximity,
}

impl Field {
    /// Every field in report order.
    pub fn all() -> &'static [Field; FIELD_COUNT] {
        &[
            Self::BaseZone,
            Self::ZoneCategory,
            Self::MaxHeight,
            Self::MaxFar,
            Self::DensityBonus,
            Self::TocTier,
            Self::Environmental,
            Self::Hazards,
            Self::TransitAccess,
        ]
    }

    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseZone => "base_zone",
            Self::ZoneCategory => "zone_category",
            Self::MaxHeight => "max_height",
            Self::MaxFar => "max_far",
            Self::DensityBonus => "density_bonus",
            Self::TocTier => "toc_tier",
            Self::Environmental => "environmental",
            Self::Hazards => "hazards",
            Self::TransitAccess => "transit_access",
        }
    }

    /// Value type.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::BaseZone | Self::ZoneCategory => FieldType::Text,
            Self::MaxHeight | Self::MaxFar => FieldType::Quantity,
            Self::DensityBonus => FieldType::Percent,
            Self::TocTier => FieldType::Tier,
            Self::Environmental | Self::Hazards => FieldType::List,
            Self::TransitAccess => FieldType::Proximity,
        }
    }

    /// True for fields a `cap` can apply to.
    pub fn is_numeric(&self) -> bool {
        matches!(self.field_type(), FieldType::Quantity | FieldType::Percent)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown field {s:?}"))
    }
}

// ─── TOC Tier ────────────────────────────────────────────────────────

/// Transit Oriented Communities tier. `None` is ineligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TocTier {
    /// Not eligible.
    #[serde(rename = "none")]
    None,
    /// Tier 1.
    #[serde(rename = "tier_1")]
    Tier1,
    /// Tier 2.
    #[serde(rename = "tier_2")]
    Tier2,
    /// Tier 3.
    #[serde(rename = "tier_3")]
    Tier3,
    /// Tier 4.
    #[serde(rename = "tier_4")]
    Tier4,
}

impl TocTier {
    /// Tier from its number, `1..=4`.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Tier1),
            2 => Some(Self::Tier2),
            3 => Some(Self::Tier3),
            4 => Some(Self::Tier4),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tier1 => "tier_1",
            Self::Tier2 => "tier_2",
            Self::Tier3 => "tier_3",
            Self::Tier4 => "tier_4",
        }
    }
}

impl fmt::Display for TocTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TocTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::None, Self::Tier1, Self::Tier2, Self::Tier3, Self::Tier4]
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown TOC tier {s:?}"))
    }
}

// ─── Field Values ────────────────────────────────────────────────────

/// One transit access entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProximityEntry {
    /// Distance from the parcel; zero when the stop lies on it.
    pub distance_ft: Quantity,
    /// Stop or line name.
    pub designation: String,
    /// Stop category (`rail`, `bus_rapid`), when the layer carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A resolved field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Text value.
    Text(String),
    /// Decimal value, serialized as a string.
    Quantity(Quantity),
    /// Whole percentage.
    Percent(u32),
    /// TOC tier.
    Tier(TocTier),
    /// Names, sorted and de-duplicated.
    List(Vec<String>),
    /// Proximity entries, nearest first.
    Proximity(Vec<ProximityEntry>),
}

impl FieldValue {
    /// Value type.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Quantity(_) => FieldType::Quantity,
            Self::Percent(_) => FieldType::Percent,
            Self::Tier(_) => FieldType::Tier,
            Self::List(_) => FieldType::List,
            Self::Proximity(_) => FieldType::Proximity,
        }
    }

    /// Borrow text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// TOC tier, if this is one.
    pub fn as_tier(&self) -> Option<TocTier> {
        match self {
            Self::Tier(t) => Some(*t),
            _ => None,
        }
    }

    /// The smaller of two numeric values of the same type.
    pub fn min_numeric(&self, other: &FieldValue) -> Option<FieldValue> {
        match (self, other) {
            (Self::Quantity(a), Self::Quantity(b)) => Some(Self::Quantity(*a.min(b))),
            (Self::Percent(a), Self::Percent(b)) => Some(Self::Percent(*a.min(b))),
            _ => None,
        }
    }

    /// Parse a literal for a field of type `ty`.
    pub fn parse_for(ty: FieldType, literal: &str) -> Result<FieldValue, String> {
        match ty {
            FieldType::Text => Ok(Self::Text(literal.to_string())),
            FieldType::Quantity => Quantity::parse(literal)
                .map(Self::Quantity)
                .map_err(|e| e.to_string()),
            FieldType::Percent => literal
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<u32>()
                .map(Self::Percent)
                .map_err(|_| format!("{literal:?} is not a whole percentage")),
            FieldType::Tier => literal.parse().map(Self::Tier),
            FieldType::List | FieldType::Proximity => {
                Err("list fields cannot take a literal value".to_string())
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Quantity(q) => write!(f, "{q}"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Tier(t) => write!(f, "{t}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Proximity(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|e| format!("{} @ {} ft", e.designation, e.distance_ft))
                    .collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for f in Field::all() {
            assert_eq!(f.as_str().parse::<Field>().unwrap(), *f);
            assert_eq!(serde_json::to_string(f).unwrap(), format!("\"{}\"", f.as_str()));
        }
    }

    #[test]
    fn tiers_order_and_serialize() {
        assert!(TocTier::None < TocTier::Tier1);
        assert!(TocTier::Tier3 < TocTier::Tier4);
        assert_eq!(serde_json::to_string(&TocTier::Tier2).unwrap(), "\"tier_2\"");
        assert_eq!(TocTier::from_number(5), None);
    }

    #[test]
    fn values_serialize_without_floats() {
        let v = FieldValue::Quantity(Quantity::from_hundredths(45));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"0.45\"");
        assert_eq!(serde_json::to_string(&FieldValue::Percent(35)).unwrap(), "35");
        assert_eq!(
            serde_json::to_string(&FieldValue::List(vec!["Liquefaction".into()])).unwrap(),
            "[\"Liquefaction\"]"
        );
    }

    #[test]
    fn literals_parse_per_type() {
        assert_eq!(
            FieldValue::parse_for(FieldType::Quantity, "3:1").unwrap(),
            FieldValue::Quantity(Quantity::from_integer(3))
        );
        assert_eq!(
            FieldValue::parse_for(FieldType::Percent, "35%").unwrap(),
            FieldValue::Percent(35)
        );
        assert!(FieldValue::parse_for(FieldType::Percent, "3.5").is_err());
        assert!(FieldValue::parse_for(FieldType::List, "x").is_err());
    }

    #[test]
    fn min_numeric_requires_matching_types() {
        let a = FieldValue::Quantity(Quantity::from_integer(45));
        let b = FieldValue::Quantity(Quantity::from_integer(28));
        assert_eq!(a.min_numeric(&b), Some(b.clone()));
        assert_eq!(a.min_numeric(&FieldValue::Percent(1)), None);
    }
}
