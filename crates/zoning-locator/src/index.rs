//! # Parcel Index Collaborator
//!
//! The geocoding / parcel-index service is external. [`ParcelIndex`] is the
//! seam; [`InMemoryParcelIndex`] serves a parcel file for local runs and
//! tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use zoning_core::Apn;

use crate::address::NormalizedAddress;
use crate::error::IndexError;
use crate::parcel::ParcelRecord;

/// Lookup service for parcel records.
///
/// Implementations may return loose candidates; the locator re-checks
/// every address candidate against the normalized query.
#[async_trait]
pub trait ParcelIndex: Send + Sync {
    /// Human-readable label for logs.
    fn describe(&self) -> String;

    /// Records with this APN.
    async fn by_apn(&self, apn: &Apn) -> Result<Vec<ParcelRecord>, IndexError>;

    /// Records whose situs address plausibly matches.
    async fn by_address(&self, address: &NormalizedAddress)
        -> Result<Vec<ParcelRecord>, IndexError>;
}

#[derive(Deserialize)]
struct ParcelFile {
    parcels: Vec<ParcelRecord>,
}

/// A parcel index held in memory, keyed by APN and by address match key.
#[derive(Debug, Default)]
pub struct InMemoryParcelIndex {
    origin: String,
    records: Vec<ParcelRecord>,
    addresses: Vec<NormalizedAddress>,
    by_apn: BTreeMap<Apn, Vec<usize>>,
    by_key: BTreeMap<String, Vec<usize>>,
}

impl InMemoryParcelIndex {
    /// Index `records`. Every situs address must normalize.
    pub fn new(
        origin: impl Into<String>,
        records: Vec<ParcelRecord>,
    ) -> Result<Self, IndexError> {
        let mut index = Self {
            origin: origin.into(),
            ..Self::default()
        };
        for record in records {
            let address = record.normalized_address()?;
            let i = index.records.len();
            index.by_apn.entry(record.apn.clone()).or_default().push(i);
            index.by_key.entry(address.match_key()).or_default().push(i);
            index.addresses.push(address);
            index.records.push(record);
        }
        Ok(index)
    }

    /// Load `{ "parcels": [..] }` from a JSON or YAML file.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let value = zoning_schema::load_value(path)?;
        let origin = path.display().to_string();
        let file: ParcelFile =
            serde_json::from_value(value).map_err(|source| IndexError::Decode {
                origin: origin.clone(),
                source,
            })?;
        Self::new(origin, file.parcels)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ParcelIndex for InMemoryParcelIndex {
    fn describe(&self) -> String {
        format!("memory:{} ({} parcels)", self.origin, self.records.len())
    }

    async fn by_apn(&self, apn: &Apn) -> Result<Vec<ParcelRecord>, IndexError> {
        Ok(self
            .by_apn
            .get(apn)
            .into_iter()
            .flatten()
            .map(|&i| self.records[i].clone())
            .collect())
    }

    async fn by_address(
        &self,
        address: &NormalizedAddress,
    ) -> Result<Vec<ParcelRecord>, IndexError> {
        Ok(self
            .by_key
            .get(&address.match_key())
            .into_iter()
            .flatten()
            .filter(|&&i| address.matches(&self.addresses[i]))
            .map(|&i| self.records[i].clone())
            .collect())
    }
}

/// Wraps an index and counts lookups. Lets callers assert how many
/// collaborator calls a request made.
#[derive(Debug)]
pub struct CountingParcelIndex<I> {
    inner: I,
    apn_lookups: AtomicUsize,
    address_lookups: AtomicUsize,
}

impl<I> CountingParcelIndex<I> {
    /// Wrap `inner`.
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            apn_lookups: AtomicUsize::new(0),
            address_lookups: AtomicUsize::new(0),
        }
    }

    /// APN lookups so far.
    pub fn apn_lookups(&self) -> usize {
        self.apn_lookups.load(Ordering::SeqCst)
    }

    /// Address lookups so far.
    pub fn address_lookups(&self) -> usize {
        self.address_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<I: ParcelIndex> ParcelIndex for CountingParcelIndex<I> {
    fn describe(&self) -> String {
        format!("counting({})", self.inner.describe())
    }

    async fn by_apn(&self, apn: &Apn) -> Result<Vec<ParcelRecord>, IndexError> {
        self.apn_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.by_apn(apn).await
    }

    async fn by_address(
        &self,
        address: &NormalizedAddress,
    ) -> Result<Vec<ParcelRecord>, IndexError> {
        self.address_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.by_address(address).await
    }
}
