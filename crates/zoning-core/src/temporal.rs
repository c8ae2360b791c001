//! # Effective Dates
//!
//! Regulatory layers carry an effective-date range. Requests carry an
//! explicit `asOf` date, and a layer participates only when its range
//! covers that date. Dates are calendar days (`NaiveDate`); zoning
//! ordinances take effect on a day, not an instant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TemporalError;

/// Half-open date interval `[effective_from, effective_until)`.
///
/// `effective_until = None` means still in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct EffectiveRange {
    effective_from: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_until: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RawRange {
    effective_from: NaiveDate,
    #[serde(default)]
    effective_until: Option<NaiveDate>,
}

impl TryFrom<RawRange> for EffectiveRange {
    type Error = TemporalError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.effective_from, raw.effective_until)
    }
}

impl EffectiveRange {
    /// Build a range, rejecting `until <= from`.
    pub fn new(from: NaiveDate, until: Option<NaiveDate>) -> Result<Self, TemporalError> {
        if let Some(until) = until {
            if until <= from {
                return Err(TemporalError::EmptyRange { from, until });
            }
        }
        Ok(Self {
            effective_from: from,
            effective_until: until,
        })
    }

    /// An open-ended range starting at `from`.
    pub fn since(from: NaiveDate) -> Self {
        Self {
            effective_from: from,
            effective_until: None,
        }
    }

    /// First day in force.
    pub fn effective_from(&self) -> NaiveDate {
        self.effective_from
    }

    /// First day no longer in force, if any.
    pub fn effective_until(&self) -> Option<NaiveDate> {
        self.effective_until
    }

    /// True if the range covers `as_of`.
    pub fn covers(&self, as_of: NaiveDate) -> bool {
        as_of >= self.effective_from && self.effective_until.map_or(true, |until| as_of < until)
    }
}

/// Today's date in UTC. Used as the default `asOf` for requests that do
/// not pin one.
pub fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn covers_is_half_open() {
        let r = EffectiveRange::new(d("2020-01-01"), Some(d("2024-01-01"))).unwrap();
        assert!(!r.covers(d("2019-12-31")));
        assert!(r.covers(d("2020-01-01")));
        assert!(r.covers(d("2023-12-31")));
        assert!(!r.covers(d("2024-01-01")));
    }

    #[test]
    fn open_ended_range_covers_future() {
        let r = EffectiveRange::since(d("2010-06-01"));
        assert!(r.covers(d("2099-01-01")));
        assert!(!r.covers(d("2010-05-31")));
    }

    #[test]
    fn empty_range_rejected() {
        assert!(EffectiveRange::new(d("2024-01-01"), Some(d("2024-01-01"))).is_err());
        assert!(EffectiveRange::new(d("2024-01-02"), Some(d("2024-01-01"))).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: EffectiveRange =
            serde_json::from_str(r#"{"effective_from":"2020-01-01"}"#).unwrap();
        assert_eq!(ok.effective_until(), None);
        let bad = serde_json::from_str::<EffectiveRange>(
            r#"{"effective_from":"2024-01-01","effective_until":"2023-01-01"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_without_null_until() {
        let r = EffectiveRange::since(d("2020-01-01"));
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"effective_from":"2020-01-01"}"#
        );
    }
}
