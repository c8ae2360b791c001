//! # zoning-schema: External Document Validation
//!
//! The engine consumes two documents it does not own: the Layer Store ETL
//! feed and the ruleset. Both arrive as JSON or YAML. This crate loads them
//! into `serde_json::Value` with path-aware errors and validates them
//! against the JSON Schemas in `schemas/` before any typed parsing happens,
//! so a malformed feed fails with an instance path rather than a serde
//! message about an untagged enum.
//!
//! Semantic validation (precedence ties, duplicate layer ids, geometry
//! validity) belongs to the crates that own those types.

pub mod document;
pub mod validate;

pub use document::{load_value, parse_value, DocumentError, DocumentFormat};
pub use validate::{DocumentKind, SchemaValidationError, SchemaValidator, Violation, Violations};
