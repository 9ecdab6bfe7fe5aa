//! Error types for OSA Core
//!
//! Provides structured errors for:
//! - Per-agent validation failures
//! - Whole-submission aggregation failures
//! - Workflow store failures

use std::fmt;

/// Classification of a validation or aggregation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required submission field is absent or empty
    MissingField,
    /// `agent_id` missing, not a string, or not a known agent
    UnknownAgent,
    /// `metadata` missing or structurally invalid
    MalformedMetadata,
    /// `success = false` without an `error_message`
    MissingErrorDetail,
    /// `execution_results` missing or not an object
    MalformedResults,
    /// The same `agent_id` appears twice in one submission
    DuplicateAgent,
}

impl ErrorKind {
    /// Stable snake_case code
    #[inline]
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingField => "missing_field",
            ErrorKind::UnknownAgent => "unknown_agent",
            ErrorKind::MalformedMetadata => "malformed_metadata",
            ErrorKind::MissingErrorDetail => "missing_error_detail",
            ErrorKind::MalformedResults => "malformed_results",
            ErrorKind::DuplicateAgent => "duplicate_agent",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single agent result that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Position in the submitted `agent_data` array
    pub index: usize,
    /// The `agent_id` as submitted, when it was a string
    pub agent_id: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    /// Create validation error
    #[inline]
    pub fn new(index: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            index,
            agent_id: None,
            kind,
            message: message.into(),
        }
    }

    /// Attach the submitted agent id
    #[inline]
    #[must_use]
    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.agent_id {
            Some(id) => write!(f, "agent_data[{}] ({id}): {}", self.index, self.message),
            None => write!(f, "agent_data[{}]: {}", self.index, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Aggregation failures. Any failure rejects the whole submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    /// Required submission field missing
    #[error("missing required field: {0}")]
    MissingField(String),

    /// One or more agent results failed validation
    #[error("{} of {total} agent result(s) rejected: {}", .failures.len(), join_failures(.failures))]
    Rejected {
        /// Number of submitted agent results
        total: usize,
        /// Every failing element, in submission order
        failures: Vec<ValidationError>,
    },
}

impl AggregationError {
    /// Kind of the (first) failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::Rejected { failures, .. } => failures
                .first()
                .map_or(ErrorKind::MalformedResults, |f| f.kind),
        }
    }

    /// Agent ids named by the failures
    #[must_use]
    pub fn failing_agents(&self) -> Vec<&str> {
        match self {
            Self::MissingField(_) => Vec::new(),
            Self::Rejected { failures, .. } => {
                failures.iter().filter_map(|f| f.agent_id.as_deref()).collect()
            }
        }
    }
}

fn join_failures(failures: &[ValidationError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Workflow store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store cannot be reached
    #[error("workflow store unavailable: {0}")]
    Unavailable(String),

    /// Store failed while handling the request
    #[error("workflow store error: {0}")]
    Internal(String),
}

/// Combined error for aggregate-then-persist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Whether the caller should retry the same submission later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
