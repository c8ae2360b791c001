//! # Canonical Serialization
//!
//! `CanonicalBytes` is the sole construction path for bytes that get
//! hashed anywhere in the engine: ruleset digests, geometry digests and the
//! determination id.
//!
//! ## Security Invariant
//!
//! The inner buffer is private. The only constructor runs float rejection
//! and then RFC 8785 (JCS) serialization via `serde_jcs`, so any function
//! that takes `&CanonicalBytes` is guaranteed sorted keys, compact
//! separators and no float formatting ambiguity.
//!
//! Two determinations for the same (parcel, asOf, snapshot, ruleset) must
//! hash identically on every platform. Float rendering is the one place JCS
//! output can drift between implementations, which is why every numeric
//! zoning value is an integer or a [`crate::Quantity`] string by the time it
//! reaches this module.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization with float rejection.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - No floats anywhere in the tree.
/// - Object keys sorted, compact separators (RFC 8785).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// `FloatRejected` if the value contains a non-integral number,
    /// `SerializationFailed` if serde cannot represent it as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Walk the JSON tree and fail on the first non-integral number.
fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_str(value: &Value) -> String {
        let cb = CanonicalBytes::new(value).expect("should canonicalize");
        String::from_utf8(cb.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn keys_are_sorted_at_every_level() {
        let data = serde_json::json!({
            "overlays": [{"rank": 1, "name": "Hillside"}],
            "base_zone": {"value": "R1", "source": "rule:base-zone"}
        });
        assert_eq!(
            canonical_str(&data),
            r#"{"base_zone":{"source":"rule:base-zone","value":"R1"},"overlays":[{"name":"Hillside","rank":1}]}"#
        );
    }

    #[test]
    fn array_order_is_preserved() {
        let data = serde_json::json!({"overlays": ["Hillside", "CDO", "HPOZ"]});
        assert_eq!(canonical_str(&data), r#"{"overlays":["Hillside","CDO","HPOZ"]}"#);
    }

    #[test]
    fn float_is_rejected() {
        let data = serde_json::json!({"max_far": 0.45});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 0.45),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn nested_float_is_rejected() {
        let data = serde_json::json!({"matches": [{"weight": {"fraction": 0.5}}]});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integral_float_literal_is_rejected() {
        // serde_json keeps 33.0 as f64; heights must be Quantity strings.
        let data = serde_json::json!({"max_height": 33.0});
        assert!(CanonicalBytes::new(&data).is_err());
    }

    #[test]
    fn integers_and_decimal_strings_pass() {
        let data = serde_json::json!({"density_bonus": 35, "max_far": "0.45", "weight_bp": 10000});
        assert_eq!(
            canonical_str(&data),
            r#"{"density_bonus":35,"max_far":"0.45","weight_bp":10000}"#
        );
    }

    #[test]
    fn null_and_bool_pass_through() {
        let data = serde_json::json!({"uncertain": true, "value": null});
        assert_eq!(canonical_str(&data), r#"{"uncertain":true,"value":null}"#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(canonical_str(&serde_json::json!({})), "{}");
        assert_eq!(canonical_str(&serde_json::json!([])), "[]");
        assert!(!CanonicalBytes::new(&serde_json::json!({})).unwrap().is_empty());
    }

    #[test]
    fn non_ascii_designations_survive() {
        let data = serde_json::json!({"designation": "Cañada Flintridge"});
        assert!(canonical_str(&data).contains('ñ'));
    }
}
