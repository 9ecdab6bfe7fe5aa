//! Workflow aggregator
//!
//! Turns one submission's agent payloads into a single [`WorkflowRun`]:
//! - every payload is validated; any failure rejects the whole batch
//! - at most one result per agent
//! - status and execution time are derived from the accepted results

use crate::error::{AggregationError, ErrorKind, ValidationError, WorkflowError};
use crate::store::{SaveOutcome, WorkflowStore};
use crate::types::{AgentKind, AgentResult, WorkflowContext, WorkflowRun};
use crate::validator::AgentResultValidator;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

/// Aggregates validated agent results into workflow runs
#[derive(Debug, Clone, Default)]
pub struct WorkflowAggregator {
    validator: AgentResultValidator,
}

impl WorkflowAggregator {
    /// Create aggregator accepting every known agent
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create aggregator with a custom validator
    #[inline]
    #[must_use]
    pub fn with_validator(validator: AgentResultValidator) -> Self {
        Self { validator }
    }

    /// Build a run from one submission
    ///
    /// # Errors
    /// - `AggregationError::MissingField` if `workflow_id` is blank or
    ///   `payloads` is empty
    /// - `AggregationError::Rejected` listing every failing element,
    ///   including duplicate agent ids
    pub fn aggregate(
        &self,
        workflow_id: &str,
        payloads: &[Value],
        context: WorkflowContext,
        received_at: DateTime<Utc>,
    ) -> Result<WorkflowRun, AggregationError> {
        if workflow_id.trim().is_empty() {
            return Err(AggregationError::MissingField("workflow_id".to_string()));
        }
        if payloads.is_empty() {
            return Err(AggregationError::MissingField("agent_data".to_string()));
        }

        let mut accepted: IndexMap<AgentKind, AgentResult> = IndexMap::with_capacity(payloads.len());
        let mut failures = Vec::new();

        for (index, payload) in payloads.iter().enumerate() {
            match self.validator.validate(index, payload) {
                Ok(result) => {
                    let kind = result.agent_id;
                    if accepted.contains_key(&kind) {
                        failures.push(
                            ValidationError::new(
                                index,
                                ErrorKind::DuplicateAgent,
                                format!("duplicate result for agent '{kind}'"),
                            )
                            .for_agent(kind.as_str()),
                        );
                    } else {
                        accepted.insert(kind, result);
                    }
                }
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            tracing::debug!(
                workflow_id,
                failed = failures.len(),
                total = payloads.len(),
                "rejecting submission"
            );
            return Err(AggregationError::Rejected {
                total: payloads.len(),
                failures,
            });
        }

        let run = WorkflowRun::new(
            workflow_id.to_string(),
            accepted.into_values().collect(),
            context,
            received_at,
        );
        tracing::debug!(
            workflow_id,
            status = %run.status(),
            agents = run.agent_results().len(),
            "aggregated workflow run"
        );
        Ok(run)
    }

    /// Aggregate and persist
    ///
    /// Nothing is written unless aggregation succeeds.
    pub async fn aggregate_and_save(
        &self,
        store: &dyn WorkflowStore,
        workflow_id: &str,
        payloads: &[Value],
        context: WorkflowContext,
        received_at: DateTime<Utc>,
    ) -> Result<(WorkflowRun, SaveOutcome), WorkflowError> {
        let run = self.aggregate(workflow_id, payloads, context, received_at)?;
        let outcome = store.save(run.clone()).await?;
        Ok((run, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MockWorkflowStore;
    use crate::types::WorkflowStatus;
    use serde_json::json;

    fn received_at() -> DateTime<Utc> {
        "2024-01-01T00:05:00Z".parse().unwrap()
    }

    fn agent(agent_id: &str, success: bool, ms: u64) -> Value {
        let mut metadata = json!({
            "success": success,
            "execution_time_ms": ms,
            "timestamp": "2024-01-01T00:00:00Z",
        });
        if !success {
            metadata["error_message"] = json!("timeout");
        }
        json!({"agent_id": agent_id, "execution_results": {}, "metadata": metadata})
    }

    #[test]
    fn partial_run_from_mixed_results() {
        let payloads = vec![agent("content_review", true, 500), agent("geo_audit", false, 200)];

        let run = WorkflowAggregator::new()
            .aggregate("wf_1", &payloads, WorkflowContext::new(), received_at())
            .unwrap();

        assert_eq!(run.status(), WorkflowStatus::Partial);
        assert_eq!(run.agent_results().len(), 2);
        assert_eq!(run.workflow_execution_time_ms(), 500);
        assert_eq!(run.workflow_timestamp(), received_at());
        assert_eq!(run.failed_agents(), vec![AgentKind::GeoAudit]);
    }

    #[test]
    fn complete_and_failed_status() {
        let aggregator = WorkflowAggregator::new();

        let all_ok = vec![agent("content_review", true, 1), agent("geo_audit", true, 2)];
        let run = aggregator
            .aggregate("wf_ok", &all_ok, WorkflowContext::new(), received_at())
            .unwrap();
        assert_eq!(run.status(), WorkflowStatus::Complete);

        let all_failed = vec![agent("content_review", false, 1), agent("geo_audit", false, 2)];
        let run = aggregator
            .aggregate("wf_failed", &all_failed, WorkflowContext::new(), received_at())
            .unwrap();
        assert_eq!(run.status(), WorkflowStatus::Failed);
    }

    #[test]
    fn explicit_context_overrides_derived_timing() {
        let supplied: DateTime<Utc> = "2023-06-01T12:00:00Z".parse().unwrap();
        let context = WorkflowContext::new()
            .with_client_name("Acme")
            .with_execution_time_ms(9_000)
            .with_timestamp(supplied);

        let run = WorkflowAggregator::new()
            .aggregate("wf_ctx", &[agent("cmp_organizer", true, 10)], context, received_at())
            .unwrap();

        assert_eq!(run.workflow_execution_time_ms(), 9_000);
        assert_eq!(run.workflow_timestamp(), supplied);
        assert_eq!(run.client_name(), Some("Acme"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let aggregator = WorkflowAggregator::new();

        let err = aggregator
            .aggregate("  ", &[agent("geo_audit", true, 1)], WorkflowContext::new(), received_at())
            .unwrap_err();
        assert_eq!(err, AggregationError::MissingField("workflow_id".to_string()));

        let err = aggregator
            .aggregate("wf", &[], WorkflowContext::new(), received_at())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn one_invalid_element_rejects_the_batch() {
        let payloads = vec![
            agent("content_review", true, 1),
            agent("not_a_real_agent", true, 1),
            agent("geo_audit", true, 1),
        ];

        let err = WorkflowAggregator::new()
            .aggregate("wf_bad", &payloads, WorkflowContext::new(), received_at())
            .unwrap_err();

        let AggregationError::Rejected { total, failures } = &err else {
            panic!("expected rejection, got {err:?}");
        };
        assert_eq!(*total, 3);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(err.failing_agents(), vec!["not_a_real_agent"]);
    }

    #[test]
    fn duplicate_agent_is_rejected() {
        let payloads = vec![agent("geo_audit", true, 1), agent("geo_audit", false, 1)];

        let err = WorkflowAggregator::new()
            .aggregate("wf_dup", &payloads, WorkflowContext::new(), received_at())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateAgent);
        assert_eq!(err.failing_agents(), vec!["geo_audit"]);
    }

    #[test]
    fn results_keep_submission_order() {
        let payloads = vec![
            agent("roadmap_generator", true, 1),
            agent("integration_health", true, 1),
            agent("audience_suggester", true, 1),
        ];

        let run = WorkflowAggregator::new()
            .aggregate("wf_order", &payloads, WorkflowContext::new(), received_at())
            .unwrap();

        let order: Vec<_> = run.agent_results().iter().map(|r| r.agent_id).collect();
        assert_eq!(
            order,
            vec![
                AgentKind::RoadmapGenerator,
                AgentKind::IntegrationHealth,
                AgentKind::AudienceSuggester
            ]
        );
    }

    #[tokio::test]
    async fn rejected_batch_is_never_saved() {
        let mut store = MockWorkflowStore::new();
        store.expect_save().never();

        let result = WorkflowAggregator::new()
            .aggregate_and_save(
                &store,
                "wf_bad",
                &[agent("nobody", true, 1)],
                WorkflowContext::new(),
                received_at(),
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Aggregation(_))));
    }

    #[tokio::test]
    async fn accepted_batch_is_saved_once() {
        let mut store = MockWorkflowStore::new();
        store
            .expect_save()
            .withf(|run| run.workflow_id() == "wf_save")
            .times(1)
            .returning(|_| Ok(SaveOutcome::Inserted));

        let (run, outcome) = WorkflowAggregator::new()
            .aggregate_and_save(
                &store,
                "wf_save",
                &[agent("geo_audit", true, 1)],
                WorkflowContext::new(),
                received_at(),
            )
            .await
            .unwrap();

        assert_eq!(run.workflow_id(), "wf_save");
        assert_eq!(outcome, SaveOutcome::Inserted);
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let mut store = MockWorkflowStore::new();
        store
            .expect_save()
            .returning(|_| Err(StoreError::Unavailable("connection refused".to_string())));

        let err = WorkflowAggregator::new()
            .aggregate_and_save(
                &store,
                "wf_store",
                &[agent("geo_audit", true, 1)],
                WorkflowContext::new(),
                received_at(),
            )
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }
}
