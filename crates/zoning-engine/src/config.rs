//! # Engine Configuration
//!
//! Settings are layered. The YAML file comes first, then `ZONING_*`
//! environment variables, then whatever the caller (usually the CLI)
//! passes as explicit overrides. Paths in the file are resolved against
//! the file's own directory.
//!
//! | Setting | File key | Environment |
//! |---------|----------|-------------|
//! | Ruleset | `ruleset` | `ZONING_RULESET` |
//! | Layer feed | `layer_feed` | `ZONING_LAYER_FEED` |
//! | Parcel index | `parcel_index` | `ZONING_PARCEL_INDEX` |
//! | Snapshot retention | `snapshot_retention` | `ZONING_SNAPSHOT_RETENTION` |
//! | Batch concurrency | `batch_concurrency` | `ZONING_BATCH_CONCURRENCY` |
//! | Default `asOf` | `default_as_of` | `ZONING_DEFAULT_AS_OF` |

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshots kept for pinned requests when nothing else is configured.
pub const DEFAULT_SNAPSHOT_RETENTION: usize = 4;

/// Concurrent resolutions per batch when nothing else is configured.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// Configuration errors. All of them abort startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`ConfigOverrides`].
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// A required setting was given nowhere.
    #[error("{setting} is not configured (set it in the config file or {env})")]
    Missing {
        setting: &'static str,
        env: &'static str,
    },

    /// A setting is present but out of range.
    #[error("invalid {setting}: {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// asOf policy
// ---------------------------------------------------------------------------

/// What `asOf` a request gets when it does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AsOfPolicy {
    /// The current UTC date at request start.
    #[default]
    Today,
    /// A fixed date, for reproducible batch runs.
    Fixed(NaiveDate),
}

impl AsOfPolicy {
    /// The date this policy yields now.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Today => Utc::now().date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

impl FromStr for AsOfPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("today") {
            return Ok(Self::Today);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self::Fixed)
            .map_err(|_| format!("expected \"today\" or a YYYY-MM-DD date, got {s:?}"))
    }
}

impl TryFrom<String> for AsOfPolicy {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AsOfPolicy> for String {
    fn from(policy: AsOfPolicy) -> Self {
        policy.to_string()
    }
}

impl std::fmt::Display for AsOfPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Today => f.write_str("today"),
            Self::Fixed(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// One configuration layer. Every field is optional; later layers win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub ruleset: Option<PathBuf>,
    pub layer_feed: Option<PathBuf>,
    pub parcel_index: Option<PathBuf>,
    pub snapshot_retention: Option<usize>,
    pub batch_concurrency: Option<usize>,
    pub default_as_of: Option<AsOfPolicy>,
}

impl ConfigOverrides {
    /// Read a YAML config file. Relative paths are anchored at the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // An empty file is an empty layer, not a parse error.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut layer: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for slot in [
            &mut layer.ruleset,
            &mut layer.layer_feed,
            &mut layer.parcel_index,
        ] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
        Ok(layer)
    }

    /// Read `ZONING_*` variables through `lookup`.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Self {
            ruleset: var("ZONING_RULESET").map(PathBuf::from),
            layer_feed: var("ZONING_LAYER_FEED").map(PathBuf::from),
            parcel_index: var("ZONING_PARCEL_INDEX").map(PathBuf::from),
            snapshot_retention: env_parse(&var, "ZONING_SNAPSHOT_RETENTION")?,
            batch_concurrency: env_parse(&var, "ZONING_BATCH_CONCURRENCY")?,
            default_as_of: env_parse(&var, "ZONING_DEFAULT_AS_OF")?,
        })
    }

    /// Read `ZONING_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(self, other: Self) -> Self {
        Self {
            ruleset: other.ruleset.or(self.ruleset),
            layer_feed: other.layer_feed.or(self.layer_feed),
            parcel_index: other.parcel_index.or(self.parcel_index),
            snapshot_retention: other.snapshot_retention.or(self.snapshot_retention),
            batch_concurrency: other.batch_concurrency.or(self.batch_concurrency),
            default_as_of: other.default_as_of.or(self.default_as_of),
        }
    }
}

fn env_parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnv {
                var: name,
                value,
                reason: e.to_string(),
            }),
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Fully resolved engine settings.
#[derive(Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ruleset YAML or JSON.
    pub ruleset: PathBuf,
    /// Layer Store ETL feed.
    pub layer_feed: PathBuf,
    /// Parcel index document.
    pub parcel_index: PathBuf,
    /// Snapshots retained for pinned requests, current included.
    pub snapshot_retention: usize,
    /// Concurrent resolutions in a batch.
    pub batch_concurrency: usize,
    /// `asOf` for requests that omit it.
    pub default_as_of: AsOfPolicy,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("ruleset", &self.ruleset.display())
            .field("layer_feed", &self.layer_feed.display())
            .field("parcel_index", &self.parcel_index.display())
            .field("snapshot_retention", &self.snapshot_retention)
            .field("batch_concurrency", &self.batch_concurrency)
            .field("default_as_of", &self.default_as_of.to_string())
            .finish()
    }
}

impl EngineConfig {
    /// File, then process environment, then `flags`.
    pub fn load(file: Option<&Path>, flags: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_with(file, |name| std::env::var(name).ok(), flags)
    }

    /// [`load`](Self::load) with an explicit environment lookup.
    pub fn load_with(
        file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
        flags: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let from_file = match file {
            Some(path) => ConfigOverrides::from_file(path)?,
            None => ConfigOverrides::default(),
        };
        let merged = from_file
            .merge(ConfigOverrides::from_env_with(env)?)
            .merge(flags);
        Self::from_overrides(merged)
    }

    /// Apply defaults and validate a merged layer.
    pub fn from_overrides(layer: ConfigOverrides) -> Result<Self, ConfigError> {
        let ruleset = require(layer.ruleset, "ruleset", "ZONING_RULESET")?;
        let layer_feed = require(layer.layer_feed, "layer_feed", "ZONING_LAYER_FEED")?;
        let parcel_index = require(layer.parcel_index, "parcel_index", "ZONING_PARCEL_INDEX")?;

        let snapshot_retention = layer
            .snapshot_retention
            .unwrap_or(DEFAULT_SNAPSHOT_RETENTION);
        if snapshot_retention == 0 {
            return Err(ConfigError::Invalid {
                setting: "snapshot_retention",
                reason: "must keep at least the current snapshot".to_string(),
            });
        }
        let batch_concurrency = layer.batch_concurrency.unwrap_or(DEFAULT_BATCH_CONCURRENCY);
        if batch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                setting: "batch_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            ruleset,
            layer_feed,
            parcel_index,
            snapshot_retention,
            batch_concurrency,
            default_as_of: layer.default_as_of.unwrap_or_default(),
        })
    }
}

fn require(
    value: Option<PathBuf>,
    setting: &'static str,
    env: &'static str,
) -> Result<PathBuf, ConfigError> {
    match value {
        Some(p) if !p.as_os_str().is_empty() => Ok(p),
        _ => Err(ConfigError::Missing { setting, env }),
    }
}
