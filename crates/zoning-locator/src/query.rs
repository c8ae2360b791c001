//! Input classification: APN or street address.

use std::fmt;

use zoning_core::Apn;

use crate::address::NormalizedAddress;
use crate::error::LocateError;

/// A normalized parcel identity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelQuery {
    /// Assessor Parcel Number.
    Apn(Apn),
    /// Street address.
    Address(NormalizedAddress),
}

impl ParcelQuery {
    /// Classify and normalize free text.
    ///
    /// APN-shaped input (ten digits, optional `-` or space separators) is
    /// an APN; anything else is parsed as a street address.
    pub fn parse(input: &str) -> Result<Self, LocateError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LocateError::InvalidInput {
                input: input.to_string(),
                reason: "input is empty".to_string(),
            });
        }
        if Apn::looks_like(trimmed) {
            return Apn::parse(trimmed)
                .map(Self::Apn)
                .map_err(|e| LocateError::InvalidInput {
                    input: input.to_string(),
                    reason: e.to_string(),
                });
        }
        NormalizedAddress::parse(trimmed)
            .map(Self::Address)
            .map_err(|problem| LocateError::InvalidInput {
                input: input.to_string(),
                reason: problem.to_string(),
            })
    }
}

impl fmt::Display for ParcelQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apn(apn) => write!(f, "APN {apn}"),
            Self::Address(addr) => write!(f, "address \"{addr}\""),
        }
    }
}
