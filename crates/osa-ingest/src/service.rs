//! Ingestion service
//!
//! One value, built at startup with its store, clock and authenticator, and
//! shared by every request. Requests for different workflows share nothing
//! mutable except the status counters.
//!
//! Each request walks
//! `Received -> Validating -> (Rejected | Aggregating) -> (Rejected | Accepted)`.

use crate::auth::{Authenticator, AuthPolicy, StaticTokens};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::submission::WorkflowSubmission;
use chrono::{DateTime, SecondsFormat, Utc};
use osa_core::{
    Clock, SaveOutcome, SystemClock, WorkflowAggregator, WorkflowRun, WorkflowStore,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Service name reported by the status snapshot
pub const SERVICE_NAME: &str = "osa-workflow-ingest";

/// Request lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Request arrived, credentials not yet checked
    Received,
    /// Decoding the submission envelope
    Validating,
    /// Validating agent results and building the run
    Aggregating,
    /// Run stored
    Accepted,
    /// Refused with an error response
    Rejected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Received => "received",
            Phase::Validating => "validating",
            Phase::Aggregating => "aggregating",
            Phase::Accepted => "accepted",
            Phase::Rejected => "rejected",
        })
    }
}

/// A stored workflow run and how it was stored
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    /// The aggregated run
    pub run: WorkflowRun,
    /// Whether an earlier run for the id was replaced
    pub outcome: SaveOutcome,
}

impl Accepted {
    /// Success response body
    #[must_use]
    pub fn body(&self) -> AcceptedBody<'_> {
        let run = &self.run;
        let succeeded = run.agent_results().iter().filter(|r| r.succeeded()).count();
        AcceptedBody {
            workflow_id: run.workflow_id(),
            status: run.status().as_str(),
            agents_received: run.agent_results(),
            workflow_execution_time_ms: run.workflow_execution_time_ms(),
            workflow_timestamp: run.workflow_timestamp().to_rfc3339_opts(SecondsFormat::Millis, true),
            message: format!(
                "Workflow {} received: {succeeded} of {} agent(s) succeeded",
                run.workflow_id(),
                run.agent_results().len()
            ),
        }
    }
}

/// JSON body of a 200 response
#[derive(Debug, Serialize)]
pub struct AcceptedBody<'a> {
    pub workflow_id: &'a str,
    pub status: &'static str,
    pub agents_received: &'a [osa_core::AgentResult],
    pub workflow_execution_time_ms: u64,
    pub workflow_timestamp: String,
    pub message: String,
}

/// Service status report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub workflows_received: u64,
    pub workflows_accepted: u64,
    pub workflows_rejected: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_received_at: Option<DateTime<Utc>>,
    pub store_reachable: bool,
}

impl StatusSnapshot {
    #[inline]
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.store_reachable
    }
}

#[derive(Debug, Default)]
struct ServiceStats {
    received: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    last_accepted: RwLock<Option<(String, DateTime<Utc>)>>,
}

/// The ingestion service
pub struct IngestService {
    aggregator: WorkflowAggregator,
    store: Arc<dyn WorkflowStore>,
    clock: Arc<dyn Clock>,
    auth: Authenticator,
    stats: ServiceStats,
    started_at: DateTime<Utc>,
}

impl IngestService {
    /// Create service with the system clock
    #[must_use]
    pub fn new(store: Arc<dyn WorkflowStore>, auth: Authenticator) -> Self {
        Self::with_clock(store, auth, Arc::new(SystemClock))
    }

    /// Create service with an explicit clock
    #[must_use]
    pub fn with_clock(store: Arc<dyn WorkflowStore>, auth: Authenticator, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            aggregator: WorkflowAggregator::new(),
            store,
            clock,
            auth,
            stats: ServiceStats::default(),
            started_at,
        }
    }

    /// Create service from configuration, accepting the configured tokens
    #[must_use]
    pub fn from_config(config: &IngestConfig, store: Arc<dyn WorkflowStore>) -> Self {
        let tokens = StaticTokens::new(config.auth.tokens.iter().cloned());
        if config.auth.policy == AuthPolicy::Enforce && tokens.is_empty() {
            tracing::warn!("auth policy is enforce but no tokens are configured; every request will be refused");
        }
        if config.auth.policy == AuthPolicy::PermitMissingForTesting {
            tracing::warn!("requests without credentials are admitted (permit_missing_for_testing)");
        }
        Self::new(store, Authenticator::new(config.auth.policy, Arc::new(tokens)))
    }

    #[inline]
    #[must_use]
    pub fn with_aggregator(mut self, aggregator: WorkflowAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Handle one submission
    ///
    /// # Errors
    /// Any [`IngestError`]; the status code tells input, auth and
    /// processing failures apart.
    pub async fn ingest(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Result<Accepted, IngestError> {
        let span = tracing::info_span!(
            "ingest",
            workflow_id = tracing::field::Empty,
            phase = %Phase::Received
        );
        let started = Instant::now();
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("osa_workflows_received_total").increment(1);

        let result = self
            .process(authorization, body)
            .instrument(span.clone())
            .await;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("osa_ingest_processing_ms").record(elapsed_ms);

        span.in_scope(|| match &result {
            Ok(accepted) => {
                span.record("phase", tracing::field::display(Phase::Accepted));
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                *self.stats.last_accepted.write() =
                    Some((accepted.run.workflow_id().to_string(), self.clock.now()));
                metrics::counter!("osa_workflows_accepted_total", "status" => accepted.run.status().as_str())
                    .increment(1);
                tracing::info!(
                    status = %accepted.run.status(),
                    agents = accepted.run.agent_results().len(),
                    replaced = accepted.outcome == SaveOutcome::Replaced,
                    elapsed_ms,
                    "workflow accepted"
                );
            }
            Err(err) => {
                span.record("phase", tracing::field::display(Phase::Rejected));
                self.record_rejection(err, elapsed_ms);
            }
        });
        result
    }

    /// Count a request refused before its body could be handed to
    /// [`IngestService::ingest`]
    pub fn refuse(&self, err: &IngestError, elapsed: Duration) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("osa_workflows_received_total").increment(1);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        metrics::histogram!("osa_ingest_processing_ms").record(elapsed_ms);
        self.record_rejection(err, elapsed_ms);
    }

    fn record_rejection(&self, err: &IngestError, elapsed_ms: f64) {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("osa_workflows_rejected_total", "reason" => err.reason()).increment(1);
        if err.is_retryable() {
            tracing::error!(error = %err, code = err.code(), elapsed_ms, "workflow processing failed");
        } else {
            tracing::warn!(error = %err, code = err.code(), elapsed_ms, "workflow rejected");
        }
    }

    async fn process(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Result<Accepted, IngestError> {
        let span = tracing::Span::current();
        let caller = self.auth.authorize(authorization)?;
        tracing::debug!(?caller, "authorized");

        span.record("phase", tracing::field::display(Phase::Validating));
        tracing::debug!("decoding submission");
        let submission = WorkflowSubmission::from_slice(body)?;
        span.record("workflow_id", submission.workflow_id.as_str());

        span.record("phase", tracing::field::display(Phase::Aggregating));
        tracing::debug!(agents = submission.agent_data.len(), "aggregating");
        let (run, outcome) = self
            .aggregator
            .aggregate_and_save(
                self.store.as_ref(),
                &submission.workflow_id,
                &submission.agent_data,
                submission.context,
                self.clock.now(),
            )
            .await?;

        Ok(Accepted { run, outcome })
    }

    /// Build the status report, pinging the store
    pub async fn status(&self) -> StatusSnapshot {
        let store_reachable = match self.store.ping().await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "workflow store ping failed");
                false
            }
        };
        let last = self.stats.last_accepted.read().clone();

        StatusSnapshot {
            status: if store_reachable { "healthy" } else { "unhealthy" },
            service: SERVICE_NAME,
            version: crate::VERSION,
            uptime_seconds: (self.clock.now() - self.started_at).num_seconds().max(0),
            workflows_received: self.stats.received.load(Ordering::Relaxed),
            workflows_accepted: self.stats.accepted.load(Ordering::Relaxed),
            workflows_rejected: self.stats.rejected.load(Ordering::Relaxed),
            last_workflow_id: last.as_ref().map(|(id, _)| id.clone()),
            last_received_at: last.map(|(_, at)| at),
            store_reachable,
        }
    }

    /// Look up a stored run
    ///
    /// # Errors
    /// If the store fails.
    pub async fn workflow(&self, workflow_id: &str) -> Result<Option<WorkflowRun>, IngestError> {
        self.store.get(workflow_id).await.map_err(IngestError::Store)
    }
}

impl fmt::Debug for IngestService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestService")
            .field("auth", &self.auth)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}
