//! OSA Core - Workflow ingestion domain
//!
//! The part of the pipeline that decides what a submission means:
//! - Validates each agent's execution payload structurally
//! - Aggregates a batch of agent results into one workflow run
//! - Defines the workflow store contract
//! - Combines per-tier confidence inputs into a display score
//!
//! # Example
//!
//! ```rust,ignore
//! use osa_core::{WorkflowAggregator, WorkflowContext};
//!
//! let payloads: Vec<serde_json::Value> = load_agent_data();
//! let run = WorkflowAggregator::new()
//!     .aggregate("wf_1", &payloads, WorkflowContext::new(), chrono::Utc::now())?;
//!
//! println!("{} -> {}", run.workflow_id(), run.status());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod aggregator;
pub mod clock;
pub mod confidence;
pub mod error;
pub mod store;
pub mod types;
pub mod validator;

// Re-exports for convenience
pub use aggregator::WorkflowAggregator;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AggregationError, ErrorKind, StoreError, ValidationError, WorkflowError};
pub use store::{InMemoryWorkflowStore, SaveOutcome, WorkflowStore};
pub use types::{
    AgentKind, AgentMetadata, AgentResult, ContentReviewResults, ExecutionResults,
    ExperimentBlueprintResults, GeoAuditResults, TypedResults, UnknownAgentId, WorkflowContext,
    WorkflowRun, WorkflowStatus,
};
pub use validator::{validate, AgentResultValidator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with OSA Core
    pub use crate::{
        AgentKind, AgentResult, Clock, WorkflowAggregator, WorkflowContext, WorkflowRun,
        WorkflowStatus, WorkflowStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
