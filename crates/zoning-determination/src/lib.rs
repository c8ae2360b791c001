//! # zoning-determination: Determination Builder
//!
//! Turns a [`RuleCoreOutput`](zoning_rules::RuleCoreOutput) into the
//! published [`Determination`]: parcel identity, fields with sources and
//! `uncertain`/`unavailable` flags, ordered overlays, the consulted
//! matches, the rule trace, a provenance entry for everything reported,
//! and warnings.
//!
//! The determination is the only thing downstream consumers (report
//! generation, LLM summarization) see. It is deterministic: the id is the
//! SHA-256 of the canonical body, and the body contains no timestamps or
//! request ids.

pub mod builder;
pub mod determination;
pub mod error;
pub mod provenance;
pub mod warning;

pub use builder::build;
pub use determination::{
    Determination, DeterminationBody, Eligibilities, ParcelSummary, ReportedField,
};
pub use error::BuildError;
pub use provenance::{ProvenanceEntry, ProvenanceRole, ProvenanceSource};
pub use warning::Warning;
