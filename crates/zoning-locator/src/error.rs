//! Parcel Locator error types.

use thiserror::Error;

use zoning_core::Apn;
use zoning_schema::DocumentError;

/// Errors from the parcel index collaborator.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The parcel file could not be read or parsed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A parcel record is invalid.
    #[error("invalid parcel record in {origin}: {source}")]
    Decode {
        /// File or other origin label.
        origin: String,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A parcel record's situs address cannot be normalized.
    #[error("parcel {apn} has an unusable situs address {address:?}: {reason}")]
    InvalidAddress {
        /// Record APN.
        apn: Apn,
        /// Raw address.
        address: String,
        /// Normalization failure.
        reason: String,
    },

    /// A remote index could not answer.
    #[error("parcel index {index} unavailable: {reason}")]
    Unavailable {
        /// Index description.
        index: String,
        /// Failure detail.
        reason: String,
    },
}

/// Errors from [`ParcelLocator::locate`](crate::ParcelLocator::locate).
#[derive(Error, Debug)]
pub enum LocateError {
    /// The input is neither an APN nor a usable street address.
    #[error("invalid parcel identity {input:?}: {reason}")]
    InvalidInput {
        /// Raw input.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No parcel matches.
    #[error("no parcel found for {query}")]
    NotFound {
        /// Normalized query.
        query: String,
    },

    /// More than one parcel plausibly matches. Never auto-resolved.
    #[error("{query} matches {} parcels: {}", candidates.len(), join_apns(candidates))]
    AmbiguousInput {
        /// Normalized query.
        query: String,
        /// Candidate APNs, sorted.
        candidates: Vec<Apn>,
    },

    /// The index collaborator failed.
    #[error("parcel index error: {0}")]
    Index(#[from] IndexError),
}

fn join_apns(apns: &[Apn]) -> String {
    apns.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
