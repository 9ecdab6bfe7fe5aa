//! Synthetic workflow payloads
//!
//! Every generated payload is structurally valid: failed agents always carry
//! a non-empty `error_message`, and `completed_at` never precedes
//! `started_at`.

use crate::config::AgentProfile;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use osa_core::AgentKind;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

const FAILURE_MESSAGES: [&str; 5] = [
    "upstream request timed out",
    "rate limit exceeded by data source",
    "authentication with data source expired",
    "insufficient data for analysis",
    "unexpected response from analysis model",
];

/// Which agents fail in a generated workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePlan {
    /// Each agent fails with its profile's probability
    Sampled,
    /// No agent fails
    None,
    /// Every agent fails
    All,
    /// Exactly the listed agents fail
    Only(Vec<AgentKind>),
}

impl FailurePlan {
    fn fails(&self, profile: &AgentProfile, rng: &mut StdRng) -> bool {
        match self {
            FailurePlan::Sampled => rng.random_bool(profile.failure_probability.clamp(0.0, 1.0)),
            FailurePlan::None => false,
            FailurePlan::All => true,
            FailurePlan::Only(agents) => agents.contains(&profile.agent),
        }
    }
}

/// Seeded generator of workflow submissions
#[derive(Debug)]
pub struct PayloadGenerator {
    rng: StdRng,
    profiles: Vec<AgentProfile>,
    client_name: String,
}

impl PayloadGenerator {
    #[must_use]
    pub fn new(seed: u64, profiles: Vec<AgentProfile>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            profiles,
            client_name: "OSA Simulator".to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Fresh workflow id, reproducible for a given seed
    pub fn workflow_id(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.random();
        format!("sim_{}", uuid::Builder::from_random_bytes(bytes).into_uuid().simple())
    }

    /// Execution time sampled within ±30% of the baseline
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn sample_execution_ms(&mut self, baseline_ms: u64) -> u64 {
        let factor: f64 = self.rng.random_range(0.7..=1.3);
        (baseline_ms as f64 * factor).round() as u64
    }

    /// One agent result as submitted on the wire
    pub fn agent_payload(&mut self, profile: &AgentProfile, failed: bool, now: DateTime<Utc>) -> Value {
        let execution_time_ms = self.sample_execution_ms(profile.baseline_ms);
        let started_at = now
            - ChronoDuration::milliseconds(i64::try_from(execution_time_ms).unwrap_or(0));

        let mut metadata = json!({
            "success": !failed,
            "execution_time_ms": execution_time_ms,
            "timestamp": rfc3339(now),
            "started_at": rfc3339(started_at),
            "completed_at": rfc3339(now),
            "progress_percentage": if failed { self.rng.random_range(10..90) } else { 100 },
            "retry_count": if failed { self.rng.random_range(1..=3) } else { 0 },
        });
        if failed {
            let message = FAILURE_MESSAGES
                .choose(&mut self.rng)
                .copied()
                .unwrap_or("agent execution failed");
            metadata["error_message"] = Value::from(message);
        }

        json!({
            "agent_id": profile.agent.as_str(),
            "agent_name": profile.agent.display_name(),
            "execution_results": if failed { json!({}) } else { self.execution_results(profile.agent) },
            "metadata": metadata,
        })
    }

    /// A full submission body covering every configured agent
    pub fn workflow(&mut self, workflow_id: &str, plan: &FailurePlan) -> Value {
        let now = Utc::now();
        let profiles = self.profiles.clone();
        let agent_data: Vec<Value> = profiles
            .iter()
            .map(|profile| {
                let failed = plan.fails(profile, &mut self.rng);
                self.agent_payload(profile, failed, now)
            })
            .collect();

        json!({
            "workflow_id": workflow_id,
            "client_name": self.client_name,
            "business_objectives": ["Improve content engagement", "Increase conversion rate"],
            "agent_data": agent_data,
        })
    }

    fn execution_results(&mut self, agent: AgentKind) -> Value {
        let score = (self.rng.random_range(0.6..0.98_f64) * 100.0).round() / 100.0;
        match agent {
            AgentKind::ContentReview => json!({
                "content_quality_score": score,
                "recommendations": [
                    {"area": "headlines", "priority": "high"},
                    {"area": "meta descriptions", "priority": "medium"},
                ],
            }),
            AgentKind::GeoAudit => json!({
                "overall_score": score,
                "issues": [{"type": "missing_schema_markup", "pages": self.rng.random_range(1..40)}],
            }),
            AgentKind::ExperimentBlueprinter => json!({
                "confidence_score": score,
                "experiments": [{"name": "Hero banner variant", "duration_days": 14}],
            }),
            other => json!({
                "summary": format!("{} completed", other.display_name()),
                "confidence_score": score,
            }),
        }
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
