//! # Validate Subcommand
//!
//! Loads a ruleset and/or layer feed through the same schema and
//! load-time checks the engine runs at startup, and reports the result
//! without serving anything.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use zoning_engine::{load_ruleset, load_snapshot, ConfigOverrides};
use zoning_schema::SchemaValidator;

use crate::{engine_config, EXIT_ERROR, EXIT_OK};

/// Arguments for `zoning validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Ruleset to check.
    #[arg(long, value_name = "PATH")]
    pub ruleset: Option<PathBuf>,

    /// Layer feed to check.
    #[arg(long, value_name = "PATH")]
    pub feed: Option<PathBuf>,
}

/// Execute the validate subcommand.
///
/// With neither flag, checks the configured ruleset and layer feed.
pub fn run_validate(args: &ValidateArgs, config: Option<&Path>) -> Result<u8> {
    let (ruleset, feed) = if args.ruleset.is_none() && args.feed.is_none() {
        let resolved = engine_config(config, ConfigOverrides::default())?;
        (Some(resolved.ruleset), Some(resolved.layer_feed))
    } else {
        (args.ruleset.clone(), args.feed.clone())
    };

    let validator = SchemaValidator::new().context("failed to compile embedded schemas")?;
    let mut failed = false;

    if let Some(path) = ruleset {
        match load_ruleset(&path, &validator) {
            Ok(r) => println!(
                "ruleset {}: OK (version {}, {} rules, {})",
                path.display(),
                r.version(),
                r.rules().len(),
                r.digest()
            ),
            Err(e) => {
                failed = true;
                println!("ruleset {}: FAIL\n  {e}", path.display());
            }
        }
    }

    if let Some(path) = feed {
        match load_snapshot(&path, &validator) {
            Ok(s) => println!(
                "layer feed {}: OK (snapshot {}, {} layers)",
                path.display(),
                s.version(),
                s.layer_count()
            ),
            Err(e) => {
                failed = true;
                println!("layer feed {}: FAIL\n  {e}", path.display());
            }
        }
    }

    Ok(if failed { EXIT_ERROR } else { EXIT_OK })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../fixtures")
            .join(name)
    }

    #[test]
    fn fixtures_validate() {
        let args = ValidateArgs {
            ruleset: Some(fixture("ruleset.yaml")),
            feed: Some(fixture("layers.json")),
        };
        assert_eq!(run_validate(&args, None).unwrap(), EXIT_OK);
    }

    #[test]
    fn duplicate_rule_ids_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(
            &path,
            "version: dup\nrules:\n  - {id: base-zone, tier: 0, priority: 1, kind: base_zone}\n  \
             - {id: base-zone, tier: 0, priority: 2, kind: base_zone}\n",
        )
        .unwrap();
        let args = ValidateArgs {
            ruleset: Some(path),
            feed: None,
        };
        assert_eq!(run_validate(&args, None).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn unreadable_feed_fails_validation() {
        let args = ValidateArgs {
            ruleset: None,
            feed: Some(fixture("missing-layers.json")),
        };
        assert_eq!(run_validate(&args, None).unwrap(), EXIT_ERROR);
    }
}
