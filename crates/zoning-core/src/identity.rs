//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier that crosses a crate boundary.
//! You cannot pass a `LayerId` where a `SourceId` is expected, and the
//! provenance trail can say exactly which namespace each reference lives in.
//!
//! The APN is the only identifier with real structure (ten digits, written
//! `NNNN-NNN-NNN` by the LA County Assessor). The rest share one rule:
//! non-empty, at most 128 characters, drawn from `[A-Za-z0-9._:/-]`.

use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

// ─── Assessor Parcel Number ──────────────────────────────────────────

/// LA County Assessor Parcel Number (also called AIN).
///
/// Stored as ten ASCII digits. Accepts `1234-005-006`, `1234005006` and
/// `1234 005 006`; always displays and serializes as `1234-005-006`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Apn(String);

impl Apn {
    /// Parse an APN, tolerating dash and space separators.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let trimmed = input.trim();
        let mut digits = String::with_capacity(10);
        for c in trimmed.chars() {
            match c {
                '0'..='9' => digits.push(c),
                '-' | ' ' => {}
                _ => {
                    return Err(IdentifierError::new(
                        "apn",
                        input,
                        format!("unexpected character {c:?}"),
                    ))
                }
            }
        }
        if digits.len() != 10 {
            return Err(IdentifierError::new(
                "apn",
                input,
                format!("expected 10 digits, found {}", digits.len()),
            ));
        }
        Ok(Self(digits))
    }

    /// True if `input` has the shape of an APN: ten digits with optional
    /// `-`/space separators and nothing else.
    pub fn looks_like(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// The ten bare digits, e.g. `1234005006`.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// Map book number (first four digits).
    pub fn map_book(&self) -> &str {
        &self.0[..4]
    }
}

impl std::fmt::Display for Apn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", &self.0[..4], &self.0[4..7], &self.0[7..])
    }
}

impl TryFrom<String> for Apn {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Apn> for String {
    fn from(apn: Apn) -> Self {
        apn.to_string()
    }
}

impl std::str::FromStr for Apn {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ─── Token identifiers ───────────────────────────────────────────────

fn validate_token(kind: &'static str, value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::new(kind, value, "must not be empty"));
    }
    if value.len() > 128 {
        return Err(IdentifierError::new(kind, value, "longer than 128 characters"));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-')))
    {
        return Err(IdentifierError::new(
            kind,
            value,
            format!("character {bad:?} is not allowed"),
        ));
    }
    Ok(())
}

macro_rules! token_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
                let value = value.into();
                validate_token($kind, &value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdentifierError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

token_id!(
    /// Provenance identifier of the dataset a layer came from
    /// (e.g. `znet`, `zimas`, `la-metro-stops`).
    SourceId,
    "source id"
);

token_id!(
    /// Identifier of a single layer record within a snapshot.
    LayerId,
    "layer id"
);

token_id!(
    /// Identifier of a rule within a ruleset.
    RuleId,
    "rule id"
);

token_id!(
    /// Version label of a Layer Store snapshot, assigned by the ETL feed.
    SnapshotVersion,
    "snapshot version"
);

token_id!(
    /// Version label of a ruleset.
    RulesetVersion,
    "ruleset version"
);

token_id!(
    /// Land-use authority a parcel falls under, e.g. `los_angeles_city`
    /// or `la_county_unincorporated`.
    Jurisdiction,
    "jurisdiction"
);
