//! OSA workflow simulator
//!
//! Drives synthetic workflows through the ingestion endpoint in three modes:
//! 1. Single: one workflow with sampled failures
//! 2. Concurrent: N independent workflows issued without waiting on each other
//! 3. Sweep: named scenarios (all-success, all-fail, partial-fail) run in order,
//!    each checked against its expected status
//!
//! Payloads are generated before any request is sent, so a seed fixes the
//! submitted bodies regardless of response timing.

use crate::config::{AgentProfile, SimulatorConfig};
use crate::generator::{FailurePlan, PayloadGenerator};
use crate::report::{ConcurrentReport, ScenarioResult, SubmissionRecord, SweepReport};
use crate::submitter::{submit_and_classify, HttpSubmitter, Submitter, TransportError};
use futures::stream::{self, StreamExt};
use osa_core::WorkflowStatus;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// A named sweep scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub plan: FailurePlan,
    pub expected: WorkflowStatus,
}

/// all-success, all-fail and, with two or more agents, partial-fail
#[must_use]
pub fn standard_scenarios(agents: &[AgentProfile]) -> Vec<Scenario> {
    let mut scenarios = vec![
        Scenario {
            name: "all-success",
            plan: FailurePlan::None,
            expected: WorkflowStatus::Complete,
        },
        Scenario {
            name: "all-fail",
            plan: FailurePlan::All,
            expected: WorkflowStatus::Failed,
        },
    ];
    if let [first, _, ..] = agents {
        scenarios.push(Scenario {
            name: "partial-fail",
            plan: FailurePlan::Only(vec![first.agent]),
            expected: WorkflowStatus::Partial,
        });
    }
    scenarios
}

/// Simulator bound to one endpoint
pub struct Simulator {
    config: SimulatorConfig,
    submitter: Arc<dyn Submitter>,
    generator: Mutex<PayloadGenerator>,
}

impl Simulator {
    /// Create simulator submitting over HTTP
    ///
    /// # Errors
    /// If the HTTP client cannot be built.
    pub fn new(config: SimulatorConfig) -> Result<Self, TransportError> {
        let submitter = HttpSubmitter::new(config.endpoint.clone(), config.request_timeout)?
            .with_token(config.token.clone());
        Ok(Self::with_submitter(config, Arc::new(submitter)))
    }

    /// Create simulator with a custom submitter
    #[must_use]
    pub fn with_submitter(config: SimulatorConfig, submitter: Arc<dyn Submitter>) -> Self {
        let generator = PayloadGenerator::new(config.seed, config.agents.clone())
            .with_client_name(config.client_name.clone());
        Self {
            config,
            submitter,
            generator: Mutex::new(generator),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn next_workflow(&self, plan: &FailurePlan) -> (String, Value) {
        let mut generator = self.generator.lock();
        let workflow_id = generator.workflow_id();
        let body = generator.workflow(&workflow_id, plan);
        (workflow_id, body)
    }

    async fn submit(&self, workflow_id: String, body: &Value) -> SubmissionRecord {
        let outcome = submit_and_classify(self.submitter.as_ref(), body).await;
        tracing::debug!(%workflow_id, accepted = outcome.is_accepted(), "workflow submitted");
        SubmissionRecord {
            workflow_id,
            outcome,
        }
    }

    /// Submit one workflow with sampled failures
    pub async fn run_single(&self) -> SubmissionRecord {
        let (workflow_id, body) = self.next_workflow(&FailurePlan::Sampled);
        self.submit(workflow_id, &body).await
    }

    /// Submit `config.concurrency` workflows in parallel
    ///
    /// With no `max_in_flight` every submission is issued at once; otherwise
    /// at most that many are outstanding.
    pub async fn run_concurrent(&self) -> ConcurrentReport {
        let workflows: Vec<(String, Value)> = (0..self.config.concurrency)
            .map(|_| self.next_workflow(&FailurePlan::Sampled))
            .collect();

        tracing::info!(
            workflows = workflows.len(),
            max_in_flight = ?self.config.max_in_flight,
            "starting concurrent run"
        );
        let started = Instant::now();
        let submissions = workflows
            .iter()
            .map(|(workflow_id, body)| self.submit(workflow_id.clone(), body));

        let records = match self.config.max_in_flight {
            None => futures::future::join_all(submissions).await,
            Some(limit) => {
                stream::iter(submissions)
                    .buffer_unordered(limit.max(1))
                    .collect::<Vec<_>>()
                    .await
            }
        };

        ConcurrentReport {
            records,
            elapsed: started.elapsed(),
            max_in_flight: self.config.max_in_flight,
        }
    }

    /// Run the standard scenarios in order
    pub async fn run_sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for scenario in standard_scenarios(&self.config.agents) {
            let (workflow_id, body) = self.next_workflow(&scenario.plan);
            let record = self.submit(workflow_id, &body).await;
            let result = ScenarioResult {
                name: scenario.name.to_string(),
                expected: scenario.expected,
                record,
            };
            if !result.passed() {
                tracing::warn!(scenario = scenario.name, "sweep scenario failed");
            }
            report.scenarios.push(result);
        }
        report
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_profiles;
    use crate::submitter::SubmitResponse;
    use async_trait::async_trait;
    use osa_core::{WorkflowAggregator, WorkflowContext};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers like the endpoint would, using the real aggregator
    #[derive(Default)]
    struct LocalSubmitter {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Submitter for LocalSubmitter {
        async fn submit(&self, body: &Value) -> Result<SubmitResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let workflow_id = body["workflow_id"].as_str().unwrap_or_default();
            let agent_data = body["agent_data"].as_array().cloned().unwrap_or_default();
            let response = match WorkflowAggregator::new().aggregate(
                workflow_id,
                &agent_data,
                WorkflowContext::new(),
                chrono::Utc::now(),
            ) {
                Ok(run) => SubmitResponse {
                    status: 200,
                    body: json!({
                        "workflow_id": run.workflow_id(),
                        "status": run.status(),
                        "agents_received": run.agent_results(),
                    }),
                    processing_time: None,
                },
                Err(err) => SubmitResponse {
                    status: 400,
                    body: json!({"error": err.kind().code(), "message": err.to_string()}),
                    processing_time: None,
                },
            };
            Ok(response)
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Submitter for Unreachable {
        async fn submit(&self, _body: &Value) -> Result<SubmitResponse, TransportError> {
            Err(TransportError::Connect("connection refused".to_string()))
        }
    }

    fn simulator(config: SimulatorConfig, submitter: Arc<dyn Submitter>) -> Simulator {
        Simulator::with_submitter(config, submitter)
    }

    #[tokio::test]
    async fn single_run_is_accepted() {
        let sim = simulator(SimulatorConfig::default(), Arc::new(LocalSubmitter::default()));
        let record = sim.run_single().await;

        assert!(record.outcome.is_accepted(), "{}", record.describe());
        assert!(!record.id_mismatch());
    }

    #[tokio::test]
    async fn unbounded_concurrent_run_issues_everything_at_once() {
        let submitter = Arc::new(LocalSubmitter::default());
        let config = SimulatorConfig::default().with_concurrency(8);
        let report = simulator(config, submitter.clone()).run_concurrent().await;

        assert_eq!(report.attempted(), 8);
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(submitter.peak.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn max_in_flight_caps_outstanding_submissions() {
        let submitter = Arc::new(LocalSubmitter::default());
        let config = SimulatorConfig::default()
            .with_concurrency(10)
            .with_max_in_flight(3);
        let report = simulator(config, submitter.clone()).run_concurrent().await;

        assert_eq!(report.accepted(), 10);
        assert!(submitter.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn sweep_hits_every_expected_status() {
        let sim = simulator(SimulatorConfig::default(), Arc::new(LocalSubmitter::default()));
        let report = sim.run_sweep().await;

        assert_eq!(report.scenarios.len(), 3);
        assert!(report.passed(), "{}", report.generate_text());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_not_a_rejection() {
        let config = SimulatorConfig::default().with_concurrency(3);
        let report = simulator(config, Arc::new(Unreachable)).run_concurrent().await;

        assert_eq!(report.transport_failures(), 3);
        assert_eq!(report.rejected(), 0);
        assert!(!report.passed());
    }

    #[test]
    fn single_agent_has_no_partial_scenario() {
        let agents = vec![default_profiles()[0]];
        let names: Vec<_> = standard_scenarios(&agents).iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["all-success", "all-fail"]);
    }
}
