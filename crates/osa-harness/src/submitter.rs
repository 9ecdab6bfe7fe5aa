//! Workflow submission transport
//!
//! A submission ends one of three ways: the endpoint accepted it, the
//! endpoint rejected it, or no answer came back. A transport failure is
//! never reported as a rejection.

use async_trait::async_trait;
use osa_core::WorkflowStatus;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Could not obtain a response from the endpoint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure
    #[error("could not reach endpoint: {0}")]
    Connect(String),

    /// No response within the request timeout
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Response arrived but the body could not be read
    #[error("unreadable response body: {0}")]
    Body(String),
}

/// Raw endpoint response
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: Value,
    /// `X-Processing-Time` header, if present
    pub processing_time: Option<String>,
}

/// Sends one workflow body to the ingestion endpoint
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit a body
    ///
    /// # Errors
    /// `TransportError` when no HTTP response was obtained. Any response,
    /// whatever its status, is `Ok`.
    async fn submit(&self, body: &Value) -> Result<SubmitResponse, TransportError>;
}

/// Submitter over HTTP
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpSubmitter {
    /// Create submitter for `endpoint`
    ///
    /// # Errors
    /// If the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: None,
            timeout,
        })
    }

    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, body: &Value) -> Result<SubmitResponse, TransportError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status();
        let processing_time = response
            .headers()
            .get("x-processing-time")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        // error bodies are JSON too; anything else is kept as text
        let body = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        Ok(SubmitResponse {
            status: status.as_u16(),
            body,
            processing_time,
        })
    }
}

/// How one submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// HTTP 200 with a workflow status
    Accepted {
        workflow_id: String,
        status: WorkflowStatus,
        agents_received: usize,
        latency: Duration,
    },
    /// The endpoint answered with an error status
    Rejected {
        http_status: u16,
        error: String,
        message: String,
        latency: Duration,
    },
    /// No answer from the endpoint
    TransportFailed { error: TransportError },
}

impl SubmissionOutcome {
    #[inline]
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::TransportFailed { .. })
    }

    /// Workflow status, when accepted
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<WorkflowStatus> {
        match self {
            Self::Accepted { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a response
    #[must_use]
    pub fn from_response(response: &SubmitResponse, latency: Duration) -> Self {
        let text = |field: &str| {
            response.body[field]
                .as_str()
                .unwrap_or_default()
                .to_string()
        };

        if response.status == StatusCode::OK.as_u16() {
            let status = serde_json::from_value::<WorkflowStatus>(response.body["status"].clone());
            if let Ok(status) = status {
                return Self::Accepted {
                    workflow_id: text("workflow_id"),
                    status,
                    agents_received: response.body["agents_received"]
                        .as_array()
                        .map_or(0, Vec::len),
                    latency,
                };
            }
            return Self::Rejected {
                http_status: response.status,
                error: "unexpected_response".to_string(),
                message: "accepted response carried no workflow status".to_string(),
                latency,
            };
        }

        Self::Rejected {
            http_status: response.status,
            error: text("error"),
            message: text("message"),
            latency,
        }
    }
}

/// Submit and classify
pub async fn submit_and_classify(submitter: &dyn Submitter, body: &Value) -> SubmissionOutcome {
    let started = Instant::now();
    match submitter.submit(body).await {
        Ok(response) => SubmissionOutcome::from_response(&response, started.elapsed()),
        Err(error) => {
            tracing::warn!(%error, "submission did not reach the endpoint");
            SubmissionOutcome::TransportFailed { error }
        }
    }
}
