//! Testing utilities for OSA workspace
//!
//! Shared payload fixtures and store doubles.

#![allow(missing_docs)]

use async_trait::async_trait;
use osa_core::{SaveOutcome, StoreError, WorkflowRun, WorkflowStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const FIXTURE_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// A successful agent result
pub fn agent_payload(agent_id: &str, execution_time_ms: u64) -> Value {
    json!({
        "agent_id": agent_id,
        "execution_results": {},
        "metadata": {
            "success": true,
            "execution_time_ms": execution_time_ms,
            "timestamp": FIXTURE_TIMESTAMP,
        },
    })
}

/// A failed agent result carrying `error_message`
pub fn failed_agent_payload(agent_id: &str, execution_time_ms: u64, error_message: &str) -> Value {
    json!({
        "agent_id": agent_id,
        "execution_results": {},
        "metadata": {
            "success": false,
            "error_message": error_message,
            "execution_time_ms": execution_time_ms,
            "timestamp": FIXTURE_TIMESTAMP,
        },
    })
}

/// A workflow submission body
pub fn workflow_body(workflow_id: &str, agent_data: Vec<Value>) -> Value {
    json!({
        "workflow_id": workflow_id,
        "agent_data": agent_data,
    })
}

/// The mixed-outcome submission: `content_review` succeeds in 500ms,
/// `geo_audit` times out after 200ms
pub fn partial_workflow_body(workflow_id: &str) -> Value {
    workflow_body(
        workflow_id,
        vec![
            agent_payload("content_review", 500),
            failed_agent_payload("geo_audit", 200, "timeout"),
        ],
    )
}

/// Store whose every call fails as unavailable
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls received
    pub fn save_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowStore for FailingStore {
    async fn save(&self, _run: WorkflowRun) -> Result<SaveOutcome, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _workflow_id: &str) -> Result<Option<WorkflowRun>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
