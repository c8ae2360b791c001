//! # Zoning Engine
//!
//! One resolution runs Parcel Locator → Overlay Resolver → Rule Engine →
//! Determination Builder against a single layer snapshot. The snapshot
//! handle is taken once, before the first await, so a concurrent refresh
//! never changes the data a request sees halfway through.
//!
//! Requests share nothing mutable. Dropping a request future at its one
//! await point (the parcel index lookup) has no side effects.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use zoning_core::SnapshotVersion;
use zoning_determination::Determination;
use zoning_layers::{LayerFeedSource, LayerSnapshot, LayerStore, SnapshotSummary};
use zoning_locator::{ParcelIndex, ParcelLocator};
use zoning_resolver::OverlayResolver;
use zoning_rules::{RuleEngine, Ruleset};

use crate::config::{AsOfPolicy, DEFAULT_BATCH_CONCURRENCY};
use crate::error::{RefreshError, ResolveError};

/// Input to one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// APN or street address, as typed.
    pub parcel_identity: String,
    /// Evaluation date. The engine's default policy applies when absent.
    pub as_of: Option<NaiveDate>,
    /// Pin a retained layer snapshot instead of the current one.
    pub snapshot_version: Option<SnapshotVersion>,
}

impl ResolutionRequest {
    /// Resolve `parcel_identity` with default date and current snapshot.
    pub fn new(parcel_identity: impl Into<String>) -> Self {
        Self {
            parcel_identity: parcel_identity.into(),
            as_of: None,
            snapshot_version: None,
        }
    }

    /// Evaluate as of `date`.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Pin the layer snapshot.
    pub fn pinned(mut self, version: SnapshotVersion) -> Self {
        self.snapshot_version = Some(version);
        self
    }
}

/// Outcome of one batch item.
#[derive(Debug)]
pub struct BatchItem {
    /// The identity as submitted.
    pub input: String,
    /// Determination or the reason there is none.
    pub result: Result<Determination, ResolveError>,
}

impl Serialize for BatchItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct ErrorView<'a> {
            kind: &'static str,
            message: &'a str,
        }

        let mut s = serializer.serialize_struct("BatchItem", 2)?;
        s.serialize_field("input", &self.input)?;
        match &self.result {
            Ok(determination) => s.serialize_field("determination", determination)?,
            Err(e) => {
                let message = e.user_message();
                s.serialize_field(
                    "error",
                    &ErrorView {
                        kind: e.kind(),
                        message: &message,
                    },
                )?;
            }
        }
        s.end()
    }
}

/// The assembled request pipeline.
pub struct ZoningEngine {
    ruleset: Arc<Ruleset>,
    rules: RuleEngine,
    resolver: OverlayResolver,
    store: Arc<LayerStore>,
    locator: ParcelLocator,
    feed_source: Option<Arc<dyn LayerFeedSource>>,
    batch_concurrency: usize,
    default_as_of: AsOfPolicy,
}

impl std::fmt::Debug for ZoningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoningEngine")
            .field("ruleset_version", self.ruleset.version())
            .field("snapshot_version", self.store.current().version())
            .field(
                "feed_source",
                &self.feed_source.as_ref().map(|s| s.describe()),
            )
            .field("batch_concurrency", &self.batch_concurrency)
            .field("default_as_of", &self.default_as_of)
            .finish()
    }
}

impl ZoningEngine {
    /// Build an engine from its loaded parts.
    pub fn new(ruleset: Arc<Ruleset>, store: Arc<LayerStore>, index: Arc<dyn ParcelIndex>) -> Self {
        Self {
            rules: RuleEngine::new(Arc::clone(&ruleset)),
            resolver: OverlayResolver::new(ruleset.resolution().clone()),
            ruleset,
            store,
            locator: ParcelLocator::new(index),
            feed_source: None,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            default_as_of: AsOfPolicy::Today,
        }
    }

    /// Source used by [`refresh_layers`](Self::refresh_layers).
    pub fn with_feed_source(mut self, source: Arc<dyn LayerFeedSource>) -> Self {
        self.feed_source = Some(source);
        self
    }

    /// Bound on concurrent batch resolutions. Zero is treated as one.
    pub fn with_batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = limit.max(1);
        self
    }

    /// `asOf` for requests that omit it.
    pub fn with_default_as_of(mut self, policy: AsOfPolicy) -> Self {
        self.default_as_of = policy;
        self
    }

    /// The loaded ruleset.
    pub fn ruleset(&self) -> &Arc<Ruleset> {
        &self.ruleset
    }

    /// The layer store.
    pub fn store(&self) -> &Arc<LayerStore> {
        &self.store
    }

    /// Per-kind overview of the current snapshot.
    pub fn layer_summary(&self) -> SnapshotSummary {
        self.store.current().summary()
    }

    // ── Single resolution ───────────────────────────────────────────

    /// Resolve one parcel.
    ///
    /// Data gaps produce a partial determination, not an error. Errors
    /// are reserved for inputs that do not identify exactly one parcel,
    /// an unretained pinned snapshot, collaborator outages and internal
    /// invariant violations.
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<Determination, ResolveError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "resolve",
            request_id = %request_id,
            input = %request.parcel_identity,
        );
        let started = Instant::now();

        let result = self.run(request).instrument(span.clone()).await;

        let outcome = match &result {
            Ok(d) if d.is_partial() => "partial",
            Ok(_) => "complete",
            Err(e) => e.kind(),
        };
        metrics::counter!("zoning_resolutions_total", "outcome" => outcome).increment(1);
        metrics::histogram!("zoning_resolution_seconds").record(started.elapsed().as_secs_f64());

        let _entered = span.enter();
        match &result {
            Ok(d) => tracing::info!(
                apn = %d.body().parcel.apn,
                snapshot = %d.body().layer_snapshot_version,
                determination_id = %d.id(),
                partial = d.is_partial(),
                "resolved parcel"
            ),
            Err(e @ (ResolveError::IncompleteProvenance { .. } | ResolveError::Internal { .. })) => {
                tracing::error!(error = %e, "resolution failed")
            }
            Err(e) => tracing::warn!(error = %e, "resolution failed"),
        }
        result
    }

    async fn run(&self, request: &ResolutionRequest) -> Result<Determination, ResolveError> {
        let snapshot = self.snapshot_for(request)?;
        let as_of = request.as_of.unwrap_or_else(|| self.default_as_of.date());

        let parcel = self.locator.locate(&request.parcel_identity).await?;
        tracing::debug!(apn = %parcel.apn(), snapshot = %snapshot.version(), %as_of, "parcel located");

        let matches = self.resolver.resolve(&snapshot, &parcel, as_of)?;
        for kind in matches.unavailable() {
            tracing::warn!(kind = %kind, snapshot = %snapshot.version(), "layer kind unavailable");
        }

        let core = self.rules.apply(&matches, parcel.jurisdiction())?;
        let determination = zoning_determination::build(&parcel, core, &matches, &self.ruleset)?;
        Ok(determination)
    }

    fn snapshot_for(&self, request: &ResolutionRequest) -> Result<Arc<LayerSnapshot>, ResolveError> {
        match &request.snapshot_version {
            Some(version) => Ok(self.store.pinned(version)?),
            None => Ok(self.store.current()),
        }
    }

    // ── Batch ───────────────────────────────────────────────────────

    /// Resolve many parcels with bounded concurrency.
    ///
    /// Results come back in input order. A failed item never aborts the
    /// others.
    pub async fn resolve_batch(self: &Arc<Self>, requests: Vec<ResolutionRequest>) -> Vec<BatchItem> {
        let total = requests.len();
        let span = tracing::info_span!("batch", items = total, concurrency = self.batch_concurrency);
        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut inputs: Vec<String> = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            inputs.push(request.parcel_identity.clone());
            let engine = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(
                async move {
                    let result = match semaphore.acquire_owned().await {
                        Ok(_permit) => engine.resolve(&request).await,
                        Err(e) => Err(ResolveError::Internal {
                            detail: format!("batch limiter closed: {e}"),
                        }),
                    };
                    (index, result)
                }
                .instrument(span.clone()),
            );
        }

        let mut results: Vec<Option<Result<Determination, ResolveError>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = results.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(e) => {
                    let _entered = span.enter();
                    tracing::error!(error = %e, "batch task failed");
                }
            }
        }

        let items: Vec<BatchItem> = inputs
            .into_iter()
            .zip(results)
            .map(|(input, result)| BatchItem {
                input,
                result: result.unwrap_or_else(|| {
                    Err(ResolveError::Internal {
                        detail: "batch task did not complete".to_string(),
                    })
                }),
            })
            .collect();

        let failed = items.iter().filter(|i| i.result.is_err()).count();
        let _entered = span.enter();
        tracing::info!(resolved = total - failed, failed, "batch finished");
        items
    }

    // ── Refresh ─────────────────────────────────────────────────────

    /// Fetch the feed and install a new snapshot.
    ///
    /// In-flight requests keep the snapshot they started with.
    pub async fn refresh_layers(&self) -> Result<SnapshotVersion, RefreshError> {
        let source = self
            .feed_source
            .as_deref()
            .ok_or(RefreshError::NoFeedSource)?;
        let snapshot = self.store.refresh(source).await?;
        tracing::info!(
            snapshot = %snapshot.version(),
            layers = snapshot.layer_count(),
            "layer snapshot installed"
        );
        Ok(snapshot.version().clone())
    }
}
