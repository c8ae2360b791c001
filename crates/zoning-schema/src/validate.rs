//! # Schema Validation
//!
//! Both schemas are embedded at compile time from `schemas/` and compiled
//! once per [`SchemaValidator`]. Validators are `Send + Sync` and can be
//! shared across a refresh task and request handlers.

use std::fmt;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

const LAYER_FEED_SCHEMA: &str = include_str!("../../../schemas/layer-feed.schema.json");
const RULESET_SCHEMA: &str = include_str!("../../../schemas/ruleset.schema.json");

/// Which external document is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Layer Store ETL feed.
    LayerFeed,
    /// Zoning ruleset.
    Ruleset,
}

impl DocumentKind {
    /// Schema file name for this document kind.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::LayerFeed => "layer-feed.schema.json",
            Self::Ruleset => "ruleset.schema.json",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LayerFeed => "layer feed",
            Self::Ruleset => "ruleset",
        })
    }
}

/// Errors from schema compilation or validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document does not conform.
    #[error("{document} failed schema validation ({} violation(s)):\n{violations}", violations.len())]
    ValidationFailed {
        /// Document kind.
        document: DocumentKind,
        /// Individual violations.
        violations: Violations,
    },

    /// An embedded schema is not valid JSON.
    #[error("embedded schema {schema_name} is not valid JSON: {source}")]
    SchemaParse {
        /// Schema file name.
        schema_name: &'static str,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An embedded schema failed to compile.
    #[error("embedded schema {schema_name} failed to compile: {reason}")]
    SchemaBuild {
        /// Schema file name.
        schema_name: &'static str,
        /// Compiler message.
        reason: String,
    },
}

/// A single violation with its JSON Pointer location.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Pointer into the validated document.
    pub instance_path: String,
    /// Pointer into the schema.
    pub schema_path: String,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Ordered list of violations.
#[derive(Debug, Clone, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are none.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the violations.
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Compiled validators for both external documents.
pub struct SchemaValidator {
    layer_feed: Validator,
    ruleset: Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile the embedded schemas.
    pub fn new() -> Result<Self, SchemaValidationError> {
        Ok(Self {
            layer_feed: compile(DocumentKind::LayerFeed, LAYER_FEED_SCHEMA)?,
            ruleset: compile(DocumentKind::Ruleset, RULESET_SCHEMA)?,
        })
    }

    /// Validate a parsed document.
    pub fn validate(&self, kind: DocumentKind, instance: &Value) -> Result<(), SchemaValidationError> {
        let validator = match kind {
            DocumentKind::LayerFeed => &self.layer_feed,
            DocumentKind::Ruleset => &self.ruleset,
        };
        let violations: Vec<Violation> = validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                document: kind,
                violations: Violations(violations),
            })
        }
    }
}

fn compile(kind: DocumentKind, text: &str) -> Result<Validator, SchemaValidationError> {
    let schema_name = kind.schema_name();
    let schema: Value = serde_json::from_str(text)
        .map_err(|source| SchemaValidationError::SchemaParse { schema_name, source })?;
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.build(&schema).map_err(|e| SchemaValidationError::SchemaBuild {
        schema_name,
        reason: e.to_string(),
    })
}
