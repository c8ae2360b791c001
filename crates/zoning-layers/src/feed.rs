//! # Layer Store ETL Feed
//!
//! The external ETL pipeline delivers a complete, already-parsed dataset:
//!
//! ```text
//! { snapshot_version, description?, coverage?: [kind], layers: [..] }
//! ```
//!
//! Feeds are validated against `layer-feed.schema.json` before typed
//! parsing, so structural errors carry JSON Pointer locations and typed
//! parsing only has to catch value-level problems (geometry, dates,
//! identifiers).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use zoning_core::{LayerKind, SnapshotVersion};
use zoning_schema::{parse_value, DocumentFormat, DocumentKind, SchemaValidator};

use crate::error::FeedError;
use crate::layer::RegulatoryLayer;

/// A parsed ETL feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerFeed {
    /// Version label for the snapshot this feed becomes.
    pub snapshot_version: SnapshotVersion,
    /// Free-text note from the ETL run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kinds the ETL run loaded, including kinds with zero records.
    #[serde(default)]
    pub coverage: Vec<LayerKind>,
    /// Layer records.
    pub layers: Vec<RegulatoryLayer>,
}

impl LayerFeed {
    /// Validate a parsed document and convert it to a typed feed.
    pub fn from_value(
        value: Value,
        origin: &str,
        validator: &SchemaValidator,
    ) -> Result<Self, FeedError> {
        validator.validate(DocumentKind::LayerFeed, &value)?;
        serde_json::from_value(value).map_err(|source| FeedError::Decode {
            origin: origin.to_string(),
            source,
        })
    }

    /// Read, validate and parse a feed file. JSON or YAML by extension.
    pub fn load(path: &Path, validator: &SchemaValidator) -> Result<Self, FeedError> {
        let value = zoning_schema::load_value(path)?;
        Self::from_value(value, &path.display().to_string(), validator)
    }
}

// ─── Feed Sources ───────────────────────────────────────────────────

/// Where refreshed feeds come from.
///
/// Fetching is the only suspension point in a refresh; snapshot
/// construction and installation are synchronous.
#[async_trait]
pub trait LayerFeedSource: Send + Sync {
    /// Human-readable label for logs.
    fn describe(&self) -> String;

    /// Fetch the latest complete feed.
    async fn fetch(&self) -> Result<LayerFeed, FeedError>;
}

/// A feed file on local disk.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
    validator: Arc<SchemaValidator>,
}

impl FileFeedSource {
    /// Read feeds from `path` using `validator`.
    pub fn new(path: impl Into<PathBuf>, validator: Arc<SchemaValidator>) -> Self {
        Self {
            path: path.into(),
            validator,
        }
    }

    /// Feed file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LayerFeedSource for FileFeedSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn fetch(&self) -> Result<LayerFeed, FeedError> {
        let format = DocumentFormat::from_path(&self.path)?;
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| zoning_schema::document::io_error(&self.path, e))?;
        let origin = self.path.display().to_string();
        let value = parse_value(&text, format, &origin)?;
        LayerFeed::from_value(value, &origin, &self.validator)
    }
}

/// A fixed in-memory feed. Used by tests and by hosts that receive feeds
/// over their own transport.
#[derive(Debug, Clone)]
pub struct StaticFeedSource {
    feed: LayerFeed,
}

impl StaticFeedSource {
    /// Serve `feed` on every fetch.
    pub fn new(feed: LayerFeed) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl LayerFeedSource for StaticFeedSource {
    fn describe(&self) -> String {
        format!("static:{}", self.feed.snapshot_version)
    }

    async fn fetch(&self) -> Result<LayerFeed, FeedError> {
        Ok(self.feed.clone())
    }
}
