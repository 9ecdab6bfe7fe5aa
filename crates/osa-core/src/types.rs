//! Core types for workflow ingestion
//!
//! Defines the fundamental types shared by the validator and aggregator:
//! - The closed set of known agents
//! - Per-agent execution results and metadata
//! - Workflow runs and their derived status

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The agents whose results a workflow run may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Integration health checks across connected platforms
    IntegrationHealth,
    /// Content quality review
    ContentReview,
    /// Generative-engine optimisation audit
    GeoAudit,
    /// Audience segment suggestions
    AudienceSuggester,
    /// Experiment design
    ExperimentBlueprinter,
    /// Personalization ideas
    PersonalizationIdeaGenerator,
    /// Customer journey mapping
    CustomerJourney,
    /// Roadmap generation
    RoadmapGenerator,
    /// Campaign management organisation
    CmpOrganizer,
}

impl AgentKind {
    /// Every known agent, in canonical order
    pub const ALL: [AgentKind; 9] = [
        AgentKind::IntegrationHealth,
        AgentKind::ContentReview,
        AgentKind::GeoAudit,
        AgentKind::AudienceSuggester,
        AgentKind::ExperimentBlueprinter,
        AgentKind::PersonalizationIdeaGenerator,
        AgentKind::CustomerJourney,
        AgentKind::RoadmapGenerator,
        AgentKind::CmpOrganizer,
    ];

    /// Wire identifier (`agent_id`)
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::IntegrationHealth => "integration_health",
            AgentKind::ContentReview => "content_review",
            AgentKind::GeoAudit => "geo_audit",
            AgentKind::AudienceSuggester => "audience_suggester",
            AgentKind::ExperimentBlueprinter => "experiment_blueprinter",
            AgentKind::PersonalizationIdeaGenerator => "personalization_idea_generator",
            AgentKind::CustomerJourney => "customer_journey",
            AgentKind::RoadmapGenerator => "roadmap_generator",
            AgentKind::CmpOrganizer => "cmp_organizer",
        }
    }

    /// Human-readable name used when a payload omits `agent_name`
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::IntegrationHealth => "Integration Health Monitor",
            AgentKind::ContentReview => "Content Review Agent",
            AgentKind::GeoAudit => "GEO Audit Agent",
            AgentKind::AudienceSuggester => "Audience Suggester",
            AgentKind::ExperimentBlueprinter => "Experiment Blueprinter",
            AgentKind::PersonalizationIdeaGenerator => "Personalization Idea Generator",
            AgentKind::CustomerJourney => "Customer Journey Agent",
            AgentKind::RoadmapGenerator => "Roadmap Generator",
            AgentKind::CmpOrganizer => "CMP Organizer",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an `agent_id` is not one of the known agents
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent id '{0}'")]
pub struct UnknownAgentId(pub String);

impl FromStr for AgentKind {
    type Err = UnknownAgentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownAgentId(s.to_string()))
    }
}

/// Typed view of a content review payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentReviewResults {
    /// Overall content quality, as reported by the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_quality_score: Option<f64>,
    /// Free-form recommendations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Value>,
    /// Fields the core does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of a GEO audit payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoAuditResults {
    /// AI search readiness score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    /// Audit findings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Value>,
    /// Fields the core does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of an experiment blueprint payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentBlueprintResults {
    /// Proposed experiments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub experiments: Vec<Value>,
    /// Agent-reported confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    /// Fields the core does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A typed view decoded from an agent payload
///
/// Serializes as the payload exactly as submitted; the view is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedResults<T> {
    view: T,
    raw: Map<String, Value>,
}

impl<T> TypedResults<T> {
    /// Decoded fields
    #[inline]
    #[must_use]
    pub fn view(&self) -> &T {
        &self.view
    }

    /// The payload as submitted
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl<T> Serialize for TypedResults<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Agent-specific execution payload
///
/// Keyed by the producing agent. Agents without a typed view, and typed
/// payloads whose fields do not match the view, are kept as `Opaque` so that
/// agent-specific fields never cause a submission to be rejected. Every
/// variant serializes back to the submitted object unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecutionResults {
    /// `content_review`
    ContentReview(TypedResults<ContentReviewResults>),
    /// `geo_audit`
    GeoAudit(TypedResults<GeoAuditResults>),
    /// `experiment_blueprinter`
    ExperimentBlueprinter(TypedResults<ExperimentBlueprintResults>),
    /// Any other agent, or a payload that did not fit its typed view
    Opaque(Map<String, Value>),
}

impl ExecutionResults {
    /// Decode an object payload for the given agent
    #[must_use]
    pub fn from_object(kind: AgentKind, object: Map<String, Value>) -> Self {
        match kind {
            AgentKind::ContentReview => typed_or_opaque(object, Self::ContentReview),
            AgentKind::GeoAudit => typed_or_opaque(object, Self::GeoAudit),
            AgentKind::ExperimentBlueprinter => {
                typed_or_opaque(object, Self::ExperimentBlueprinter)
            }
            _ => Self::Opaque(object),
        }
    }

    /// Whether the payload decoded into a typed view
    #[inline]
    #[must_use]
    pub fn is_typed(&self) -> bool {
        !matches!(self, Self::Opaque(_))
    }

    /// The payload as submitted
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        match self {
            Self::ContentReview(typed) => typed.raw(),
            Self::GeoAudit(typed) => typed.raw(),
            Self::ExperimentBlueprinter(typed) => typed.raw(),
            Self::Opaque(map) => map,
        }
    }
}

fn typed_or_opaque<T, F>(object: Map<String, Value>, wrap: F) -> ExecutionResults
where
    T: DeserializeOwned,
    F: FnOnce(TypedResults<T>) -> ExecutionResults,
{
    match serde_json::from_value::<T>(Value::Object(object.clone())) {
        Ok(view) => wrap(TypedResults { view, raw: object }),
        Err(_) => ExecutionResults::Opaque(object),
    }
}

/// Execution metadata reported alongside each agent result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMetadata {
    /// Wall-clock execution time
    pub execution_time_ms: u64,
    /// When the agent reported
    pub timestamp: DateTime<Utc>,
    /// Whether the agent produced usable output
    pub success: bool,
    /// Failure detail, always present when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the agent started work
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the agent finished; never before `started_at`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// 0–100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
    /// Attempts the agent made before reporting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

/// One agent's validated result within a workflow run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    /// Producing agent
    pub agent_id: AgentKind,
    /// Submitted name, or the agent's display name
    pub agent_name: String,
    /// Agent-specific payload, echoed as submitted
    pub execution_results: ExecutionResults,
    /// Execution metadata
    pub metadata: AgentMetadata,
}

impl AgentResult {
    /// Whether this agent succeeded
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.metadata.success
    }
}

/// Overall outcome of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// Every agent succeeded
    Complete,
    /// Some, but not all, agents succeeded
    Partial,
    /// No agent succeeded
    Failed,
}

impl WorkflowStatus {
    /// Derive status from success counts
    #[must_use]
    pub fn from_counts(succeeded: usize, total: usize) -> Self {
        if succeeded == 0 {
            WorkflowStatus::Failed
        } else if succeeded == total {
            WorkflowStatus::Complete
        } else {
            WorkflowStatus::Partial
        }
    }

    /// Lowercase wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Complete => "complete",
            WorkflowStatus::Partial => "partial",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional submission-level context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowContext {
    pub client_name: Option<String>,
    pub business_objectives: Vec<String>,
    /// Overrides the aggregation time when supplied
    pub workflow_timestamp: Option<DateTime<Utc>>,
    /// Overrides the max-over-agents execution time when supplied
    pub workflow_execution_time_ms: Option<u64>,
    pub workflow_metadata: Map<String, Value>,
}

impl WorkflowContext {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With client name
    #[inline]
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// With explicit execution time
    #[inline]
    #[must_use]
    pub fn with_execution_time_ms(mut self, ms: u64) -> Self {
        self.workflow_execution_time_ms = Some(ms);
        self
    }

    /// With explicit workflow timestamp
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.workflow_timestamp = Some(timestamp);
        self
    }
}

/// An aggregated workflow run
///
/// Built only by the aggregator. Agent results cannot be modified once the
/// run exists; a later submission for the same id produces a new run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowRun {
    workflow_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    business_objectives: Vec<String>,
    agent_results: Vec<AgentResult>,
    workflow_timestamp: DateTime<Utc>,
    workflow_execution_time_ms: u64,
    status: WorkflowStatus,
    #[serde(skip_serializing_if = "Map::is_empty")]
    workflow_metadata: Map<String, Value>,
}

impl WorkflowRun {
    pub(crate) fn new(
        workflow_id: String,
        agent_results: Vec<AgentResult>,
        context: WorkflowContext,
        received_at: DateTime<Utc>,
    ) -> Self {
        let succeeded = agent_results.iter().filter(|r| r.succeeded()).count();
        let status = WorkflowStatus::from_counts(succeeded, agent_results.len());
        let workflow_execution_time_ms = context.workflow_execution_time_ms.unwrap_or_else(|| {
            agent_results
                .iter()
                .map(|r| r.metadata.execution_time_ms)
                .max()
                .unwrap_or(0)
        });

        Self {
            workflow_id,
            client_name: context.client_name,
            business_objectives: context.business_objectives,
            agent_results,
            workflow_timestamp: context.workflow_timestamp.unwrap_or(received_at),
            workflow_execution_time_ms,
            status,
            workflow_metadata: context.workflow_metadata,
        }
    }

    #[inline]
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    #[inline]
    #[must_use]
    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn business_objectives(&self) -> &[String] {
        &self.business_objectives
    }

    /// Results in submission order
    #[inline]
    #[must_use]
    pub fn agent_results(&self) -> &[AgentResult] {
        &self.agent_results
    }

    #[inline]
    #[must_use]
    pub fn workflow_timestamp(&self) -> DateTime<Utc> {
        self.workflow_timestamp
    }

    #[inline]
    #[must_use]
    pub fn workflow_execution_time_ms(&self) -> u64 {
        self.workflow_execution_time_ms
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn workflow_metadata(&self) -> &Map<String, Value> {
        &self.workflow_metadata
    }

    /// Result for a specific agent, if it took part
    #[must_use]
    pub fn result_for(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.agent_results.iter().find(|r| r.agent_id == kind)
    }

    /// Agents that reported `success = false`
    #[must_use]
    pub fn failed_agents(&self) -> Vec<AgentKind> {
        self.agent_results
            .iter()
            .filter(|r| !r.succeeded())
            .map(|r| r.agent_id)
            .collect()
    }
}
