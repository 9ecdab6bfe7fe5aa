//! Ingestion errors and their HTTP mapping
//!
//! - input errors: 400
//! - body over the configured limit: 413
//! - credentials: 401
//! - store and internal failures: 500, retryable

use chrono::{SecondsFormat, Utc};
use osa_core::{AggregationError, StoreError, WorkflowError};
use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

/// Why a request was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    /// Body is not a JSON object
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// Body longer than the configured limit
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// `workflow_id` or `agent_data` missing or unusable
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Optional submission field with the wrong shape
    #[error("invalid field {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error(transparent)]
    Aggregation(AggregationError),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody(_)
            | Self::MissingField(_)
            | Self::InvalidField { .. }
            | Self::Aggregation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable snake_case code for the `error` field
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedBody(_) => "malformed_body",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::MissingField(_) => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
            Self::Aggregation(err) => err.kind().code(),
            Self::Unauthorized(_) => "unauthorized",
            Self::Store(StoreError::Unavailable(_)) => "store_unavailable",
            Self::Store(StoreError::Internal(_)) => "store_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the caller should retry the same request later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Label for the rejection counter
    #[must_use]
    pub fn reason(&self) -> &'static str {
        let status = self.status_code();
        if status == StatusCode::UNAUTHORIZED {
            "auth"
        } else if status.is_client_error() {
            "input"
        } else {
            "processing"
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.to_string())
    }
}

impl From<WorkflowError> for IngestError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Aggregation(AggregationError::MissingField(field)) => {
                Self::MissingField(field)
            }
            WorkflowError::Aggregation(err) => Self::Aggregation(err),
            WorkflowError::Store(err) => Self::Store(err),
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorBody {
    /// Body stamped with the current time
    #[must_use]
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
