//! Simulator configuration

use osa_core::AgentKind;
use std::time::Duration;

/// Default ingestion endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/opal/osa-workflow";

/// Timing and reliability profile for one synthetic agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentProfile {
    pub agent: AgentKind,
    /// Typical execution time; samples fall within ±30%
    pub baseline_ms: u64,
    /// Chance that a sampled run fails, 0.0–1.0
    pub failure_probability: f64,
}

impl AgentProfile {
    /// Baseline profile for an agent
    #[must_use]
    pub fn baseline(agent: AgentKind) -> Self {
        let baseline_ms = match agent {
            AgentKind::IntegrationHealth => 2_500,
            AgentKind::ContentReview => 8_000,
            AgentKind::GeoAudit => 6_000,
            AgentKind::AudienceSuggester => 5_000,
            AgentKind::ExperimentBlueprinter => 7_000,
            AgentKind::PersonalizationIdeaGenerator => 6_500,
            AgentKind::CustomerJourney => 9_000,
            AgentKind::RoadmapGenerator => 10_000,
            AgentKind::CmpOrganizer => 4_000,
        };
        Self {
            agent,
            baseline_ms,
            failure_probability: 0.1,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability.clamp(0.0, 1.0);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_baseline_ms(mut self, baseline_ms: u64) -> Self {
        self.baseline_ms = baseline_ms;
        self
    }
}

/// Baseline profiles for all nine agents
#[must_use]
pub fn default_profiles() -> Vec<AgentProfile> {
    AgentKind::ALL.into_iter().map(AgentProfile::baseline).collect()
}

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Ingestion endpoint URL
    pub endpoint: String,
    /// Bearer token sent with every submission
    pub token: Option<String>,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Agents included in each synthetic workflow
    pub agents: Vec<AgentProfile>,
    /// Workflows submitted by a concurrent run
    pub concurrency: usize,
    /// Cap on simultaneous submissions; `None` issues all at once
    pub max_in_flight: Option<usize>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Client name attached to every workflow
    pub client_name: String,
}

impl SimulatorConfig {
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_agents(mut self, agents: Vec<AgentProfile>) -> Self {
        self.agents = agents;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight.max(1));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set every agent's failure probability
    #[must_use]
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        for profile in &mut self.agents {
            *profile = profile.with_failure_probability(probability);
        }
        self
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            seed: 42,
            agents: default_profiles(),
            concurrency: 10,
            max_in_flight: None,
            request_timeout: Duration::from_secs(30),
            client_name: "OSA Simulator".to_string(),
        }
    }
}
