//! # Resolve Subcommand
//!
//! Resolves one parcel and prints its determination as JSON on stdout.
//! Logs go to stderr, so stdout can be piped straight to the summarizer.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;

use zoning_core::SnapshotVersion;
use zoning_engine::{ResolutionRequest, ZoningEngine};

use crate::{to_json, EXIT_OK, EXIT_RESOLUTION};

/// Arguments for `zoning resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// APN (`1234-005-006` or `1234005006`) or street address.
    #[arg(value_name = "APN|ADDRESS")]
    pub parcel: String,

    /// Evaluation date, YYYY-MM-DD. Defaults to the configured policy.
    #[arg(long, value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Evaluate against a retained layer snapshot instead of the current one.
    #[arg(long, value_name = "VERSION")]
    pub snapshot: Option<String>,

    /// Print single-line JSON.
    #[arg(long)]
    pub compact: bool,
}

impl ResolveArgs {
    /// The engine request these arguments describe.
    pub fn request(&self) -> Result<ResolutionRequest> {
        let mut request = ResolutionRequest::new(self.parcel.as_str());
        if let Some(date) = self.as_of {
            request = request.as_of(date);
        }
        if let Some(version) = &self.snapshot {
            let version = SnapshotVersion::new(version.as_str())
                .with_context(|| format!("invalid snapshot version {version:?}"))?;
            request = request.pinned(version);
        }
        Ok(request)
    }
}

/// Execute the resolve subcommand.
///
/// Returns [`EXIT_RESOLUTION`] when the input does not identify exactly
/// one parcel. A partial determination is still a success.
pub async fn run_resolve(args: &ResolveArgs, engine: &ZoningEngine) -> Result<u8> {
    let request = args.request()?;
    match engine.resolve(&request).await {
        Ok(determination) => {
            if determination.is_partial() {
                tracing::warn!(
                    apn = %determination.body().parcel.apn,
                    "determination is partial; see warnings"
                );
            }
            println!("{}", to_json(&determination, args.compact)?);
            Ok(EXIT_OK)
        }
        Err(e) if e.is_resolution_error() => {
            eprintln!("{}", e.user_message());
            Ok(EXIT_RESOLUTION)
        }
        // Detail was logged by the engine; the operator sees the safe text.
        Err(e) => Err(anyhow::anyhow!(e.user_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use zoning_engine::ConfigOverrides;

    use crate::start_engine;

    fn config() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/zoning.yaml")
    }

    fn args(parcel: &str) -> ResolveArgs {
        ResolveArgs {
            parcel: parcel.to_string(),
            as_of: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            snapshot: None,
            compact: true,
        }
    }

    #[test]
    fn request_carries_date_and_snapshot() {
        let mut a = args("1234-005-006");
        a.snapshot = Some("2024-01-15.1".to_string());
        let request = a.request().unwrap();
        assert_eq!(request.parcel_identity, "1234-005-006");
        assert_eq!(request.as_of, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(request.snapshot_version.unwrap().as_str(), "2024-01-15.1");
    }

    #[tokio::test]
    async fn resolve_exit_codes() {
        let engine = start_engine(Some(config().as_path()), ConfigOverrides::default()).unwrap();
        assert_eq!(run_resolve(&args("1234-005-006"), &engine).await.unwrap(), EXIT_OK);
        assert_eq!(
            run_resolve(&args("123 Main St"), &engine).await.unwrap(),
            EXIT_RESOLUTION
        );
        assert_eq!(
            run_resolve(&args("0000-000-000"), &engine).await.unwrap(),
            EXIT_RESOLUTION
        );
    }
}
