//! Workflow store contract
//!
//! The store is an external collaborator. The aggregator only needs `save`
//! and `get`; `ping` backs the service status report.
//!
//! Repeated submissions for the same `workflow_id` are last-write-wins: the
//! earlier run is replaced wholesale, never patched.

use crate::error::StoreError;
use crate::types::WorkflowRun;
use async_trait::async_trait;
use dashmap::DashMap;

/// Outcome of persisting a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No run existed for this id
    Inserted,
    /// An earlier run for this id was replaced
    Replaced,
}

/// Persistence for aggregated workflow runs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Persist a run
    async fn save(&self, run: WorkflowRun) -> Result<SaveOutcome, StoreError>;

    /// Fetch a run by id
    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowRun>, StoreError>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    runs: DashMap<String, WorkflowRun>,
}

impl InMemoryWorkflowStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether the store holds no runs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn save(&self, run: WorkflowRun) -> Result<SaveOutcome, StoreError> {
        let workflow_id = run.workflow_id().to_string();
        match self.runs.insert(workflow_id, run) {
            Some(previous) => {
                tracing::warn!(
                    workflow_id = previous.workflow_id(),
                    previous_status = %previous.status(),
                    "replacing earlier run for workflow id"
                );
                Ok(SaveOutcome::Replaced)
            }
            None => Ok(SaveOutcome::Inserted),
        }
    }

    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowRun>, StoreError> {
        Ok(self.runs.get(workflow_id).map(|entry| entry.value().clone()))
    }
}
