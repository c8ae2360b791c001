//! # Parcel Locator
//!
//! `locate(addressOrApn) → Parcel`. Pure lookup against the parcel index:
//! one index call per request, no other side effects. Multiple distinct
//! parcels fail with `AmbiguousInput`; the locator never picks one.

use std::collections::BTreeMap;
use std::sync::Arc;

use zoning_core::Apn;

use crate::error::LocateError;
use crate::index::ParcelIndex;
use crate::parcel::{Parcel, ParcelRecord};
use crate::query::ParcelQuery;

/// Resolves parcel identities against a [`ParcelIndex`].
#[derive(Clone)]
pub struct ParcelLocator {
    index: Arc<dyn ParcelIndex>,
}

impl std::fmt::Debug for ParcelLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParcelLocator")
            .field("index", &self.index.describe())
            .finish()
    }
}

impl ParcelLocator {
    /// Locate against `index`.
    pub fn new(index: Arc<dyn ParcelIndex>) -> Self {
        Self { index }
    }

    /// Resolve free text to exactly one parcel.
    pub async fn locate(&self, input: &str) -> Result<Parcel, LocateError> {
        let query = ParcelQuery::parse(input)?;
        self.locate_query(&query).await
    }

    /// Resolve an already-classified query.
    pub async fn locate_query(&self, query: &ParcelQuery) -> Result<Parcel, LocateError> {
        let candidates = match query {
            ParcelQuery::Apn(apn) => self
                .index
                .by_apn(apn)
                .await?
                .into_iter()
                .filter(|r| &r.apn == apn)
                .collect::<Vec<_>>(),
            ParcelQuery::Address(address) => {
                let mut kept = Vec::new();
                for record in self.index.by_address(address).await? {
                    if address.matches(&record.normalized_address()?) {
                        kept.push(record);
                    }
                }
                kept
            }
        };

        // Same APN listed twice is one parcel; first record wins.
        let mut distinct: BTreeMap<Apn, ParcelRecord> = BTreeMap::new();
        for record in candidates {
            distinct.entry(record.apn.clone()).or_insert(record);
        }

        let query_label = query.to_string();
        if distinct.len() > 1 {
            tracing::debug!(query = %query_label, candidates = distinct.len(), "ambiguous parcel identity");
            return Err(LocateError::AmbiguousInput {
                query: query_label,
                candidates: distinct.into_keys().collect(),
            });
        }
        match distinct.pop_first() {
            Some((_, record)) => {
                let parcel = Parcel::from_record(record)?;
                tracing::debug!(query = %query_label, apn = %parcel.apn(), "parcel located");
                Ok(parcel)
            }
            None => {
                tracing::debug!(query = %query_label, "no parcel matched");
                Err(LocateError::NotFound { query: query_label })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CountingParcelIndex, InMemoryParcelIndex};
    use zoning_core::{Geometry, Jurisdiction};

    fn record(apn: &str, address: &str, city: Option<&str>) -> ParcelRecord {
        ParcelRecord {
            apn: Apn::parse(apn).unwrap(),
            address: address.to_string(),
            city: city.map(str::to_string),
            zip: None,
            jurisdiction: Jurisdiction::new("los_angeles_city").unwrap(),
            geometry: Geometry::rect(0.0, 0.0, 50.0, 100.0).unwrap(),
            use_type: None,
            assessor_zoning: None,
        }
    }

    fn locator(records: Vec<ParcelRecord>) -> (ParcelLocator, Arc<CountingParcelIndex<InMemoryParcelIndex>>) {
        let index = Arc::new(CountingParcelIndex::new(
            InMemoryParcelIndex::new("test", records).unwrap(),
        ));
        (ParcelLocator::new(index.clone()), index)
    }

    #[tokio::test]
    async fn locates_by_apn_in_any_spelling() {
        let (loc, _) = locator(vec![record("1234-005-006", "123 Main St", None)]);
        for input in ["1234-005-006", "1234005006", "1234 005 006"] {
            let parcel = loc.locate(input).await.unwrap();
            assert_eq!(parcel.apn().to_string(), "1234-005-006");
        }
    }

    #[tokio::test]
    async fn two_parcels_on_one_address_are_ambiguous() {
        let (loc, index) = locator(vec![
            record("2222-001-001", "123 Main St", Some("Los Angeles")),
            record("1111-001-001", "123 Main St", Some("Pasadena")),
        ]);
        match loc.locate("123 Main St").await {
            Err(LocateError::AmbiguousInput { candidates, .. }) => {
                let apns: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                assert_eq!(apns, vec!["1111-001-001", "2222-001-001"]);
            }
            other => panic!("expected AmbiguousInput, got {other:?}"),
        }
        assert_eq!(index.address_lookups(), 1);

        // City disambiguates.
        let parcel = loc.locate("123 Main St, Pasadena").await.unwrap();
        assert_eq!(parcel.apn().to_string(), "1111-001-001");
    }

    #[tokio::test]
    async fn duplicate_apn_records_are_one_parcel() {
        let (loc, _) = locator(vec![
            record("1234-005-006", "123 Main St", None),
            record("1234-005-006", "123 Main Street", None),
        ]);
        assert!(loc.locate("123 main").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_inputs_are_not_found() {
        let (loc, _) = locator(vec![record("1234-005-006", "123 Main St", None)]);
        assert!(matches!(
            loc.locate("9999-999-999").await,
            Err(LocateError::NotFound { .. })
        ));
        assert!(matches!(
            loc.locate("124 Main St").await,
            Err(LocateError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_index() {
        let (loc, index) = locator(vec![]);
        assert!(matches!(
            loc.locate("   ").await,
            Err(LocateError::InvalidInput { .. })
        ));
        assert_eq!(index.apn_lookups() + index.address_lookups(), 0);
    }
}
