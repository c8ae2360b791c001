//! # Parcels
//!
//! [`ParcelRecord`] is what the parcel index returns; [`Parcel`] is the
//! located, immutable identity handed to the rest of the pipeline.

use serde::{Deserialize, Serialize};

use zoning_core::{Apn, Geometry, Jurisdiction};

use crate::address::NormalizedAddress;
use crate::error::IndexError;

/// One row from the parcel index (assessor roll joined with parcel
/// geometry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    /// Assessor Parcel Number.
    pub apn: Apn,
    /// Situs street line, e.g. `123 N MAIN ST`.
    pub address: String,
    /// Situs city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Situs ZIP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// Jurisdiction tag (`los_angeles_city`, `la_county_unincorporated`).
    pub jurisdiction: Jurisdiction,
    /// Parcel polygon or centroid.
    pub geometry: Geometry,
    /// Assessor use description, e.g. `Single Family Residence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    /// Assessor zoning string (`ZoningPDB`), e.g. `LAR1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessor_zoning: Option<String>,
}

impl ParcelRecord {
    /// Normalized situs address including city and ZIP columns.
    pub fn normalized_address(&self) -> Result<NormalizedAddress, IndexError> {
        NormalizedAddress::parse(&self.address)
            .map(|a| a.with_locality(self.city.as_deref(), self.zip.as_deref()))
            .map_err(|problem| IndexError::InvalidAddress {
                apn: self.apn.clone(),
                address: self.address.clone(),
                reason: problem.to_string(),
            })
    }
}

/// A located parcel. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    apn: Apn,
    address: NormalizedAddress,
    jurisdiction: Jurisdiction,
    geometry: Geometry,
    use_type: Option<String>,
    assessor_zoning: Option<String>,
}

impl Parcel {
    /// Build from an index record.
    pub fn from_record(record: ParcelRecord) -> Result<Self, IndexError> {
        let address = record.normalized_address()?;
        Ok(Self {
            apn: record.apn,
            address,
            jurisdiction: record.jurisdiction,
            geometry: record.geometry,
            use_type: record.use_type,
            assessor_zoning: record.assessor_zoning,
        })
    }

    /// Assessor Parcel Number.
    pub fn apn(&self) -> &Apn {
        &self.apn
    }

    /// Normalized situs address.
    pub fn address(&self) -> &NormalizedAddress {
        &self.address
    }

    /// Jurisdiction tag.
    pub fn jurisdiction(&self) -> &Jurisdiction {
        &self.jurisdiction
    }

    /// Parcel geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Assessor use description.
    pub fn use_type(&self) -> Option<&str> {
        self.use_type.as_deref()
    }

    /// Assessor zoning string.
    pub fn assessor_zoning(&self) -> Option<&str> {
        self.assessor_zoning.as_deref()
    }
}
