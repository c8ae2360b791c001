//! # Layer Attribute Values
//!
//! ETL feeds carry flat attribute maps (`ZONE_CMPLT`, `max_far`,
//! `stop_type`). Values are strings, integers, booleans or decimals; a
//! decimal is normalized to [`Quantity`] at load so no float survives into
//! a snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use zoning_core::Quantity;

/// One attribute value on a [`RegulatoryLayer`](crate::RegulatoryLayer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag.
    Flag(bool),
    /// Whole number.
    Integer(i64),
    /// Fixed-point decimal. Serialized as a decimal string.
    Decimal(Quantity),
    /// Free text.
    Text(String),
}

impl AttributeValue {
    /// Numeric reading of the value.
    ///
    /// Text is parsed as a quantity (`"45 ft"`, `"3:1"`). Flags are never
    /// numeric.
    pub fn as_quantity(&self) -> Option<Quantity> {
        match self {
            Self::Integer(i) => Some(Quantity::from_integer(*i)),
            Self::Decimal(q) => Some(*q),
            Self::Text(s) => Quantity::parse(s).ok(),
            Self::Flag(_) => None,
        }
    }

    /// Borrow text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean reading. Accepts `Y`/`N` and `true`/`false` text, which
    /// county exports use interchangeably.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "Y" | "YES" | "TRUE" => Some(true),
                "N" | "NO" | "FALSE" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// True for empty or whitespace-only text. ETL exports use empty
    /// strings for nulls.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(q) => write!(f, "{q}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AttributeVisitor;

        impl serde::de::Visitor<'_> for AttributeVisitor {
            type Value = AttributeValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, integer, boolean or decimal attribute value")
            }

            fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<AttributeValue, E> {
                Ok(AttributeValue::Flag(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<AttributeValue, E> {
                Ok(AttributeValue::Integer(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<AttributeValue, E> {
                i64::try_from(v)
                    .map(AttributeValue::Integer)
                    .map_err(|_| E::custom("integer attribute out of range"))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<AttributeValue, E> {
                Quantity::from_f64(v)
                    .map(AttributeValue::Decimal)
                    .map_err(E::custom)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<AttributeValue, E> {
                Ok(AttributeValue::Text(v.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<AttributeValue, E> {
                Ok(AttributeValue::Text(v))
            }
        }

        deserializer.deserialize_any(AttributeVisitor)
    }
}
