//! Shared JSON/YAML loading.
//!
//! YAML is deserialized straight into `serde_json::Value`, so the same
//! schema and the same typed parsers serve both formats. YAML mappings with
//! non-string keys fail here rather than later.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Errors loading a document from disk or text.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// Reading the file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// JSON syntax error.
    #[error("JSON parse error in {origin}: {source}")]
    JsonParse {
        /// File path or other origin label.
        origin: String,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// YAML syntax error.
    #[error("YAML parse error in {origin}: {source}")]
    YamlParse {
        /// File path or other origin label.
        origin: String,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// The file extension is neither JSON nor YAML.
    #[error("unsupported document extension for {} (expected .json, .yaml or .yml)", path.display())]
    UnsupportedExtension {
        /// Offending path.
        path: PathBuf,
    },
}

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON.
    Json,
    /// YAML.
    Yaml,
}

impl DocumentFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(DocumentError::UnsupportedExtension {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Parse document text. `origin` labels errors (usually the file path).
pub fn parse_value(text: &str, format: DocumentFormat, origin: &str) -> Result<Value, DocumentError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|source| DocumentError::JsonParse {
            origin: origin.to_string(),
            source,
        }),
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|source| DocumentError::YamlParse {
            origin: origin.to_string(),
            source,
        }),
    }
}

/// Read and parse a document, choosing the format by extension.
pub fn load_value(path: &Path) -> Result<Value, DocumentError> {
    let format = DocumentFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    parse_value(&text, format, &path.display().to_string())
}

/// Map an IO error, singling out missing files.
pub fn io_error(path: &Path, e: std::io::Error) -> DocumentError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DocumentError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}
