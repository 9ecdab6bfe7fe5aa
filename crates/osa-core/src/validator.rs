//! Agent result validator
//!
//! Structural validation of one agent's execution payload. Pure: no side
//! effects, no clock, no store. Agent-specific fields inside
//! `execution_results` are not inspected.

use crate::error::{ErrorKind, ValidationError};
use crate::types::{AgentKind, AgentMetadata, AgentResult, ExecutionResults};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Structural validator for submitted agent results
#[derive(Debug, Clone)]
pub struct AgentResultValidator {
    accepted: HashSet<AgentKind>,
}

impl AgentResultValidator {
    /// Validator accepting every known agent
    #[must_use]
    pub fn new() -> Self {
        Self {
            accepted: AgentKind::ALL.into_iter().collect(),
        }
    }

    /// Validator accepting only the given agents
    #[must_use]
    pub fn with_agents(agents: impl IntoIterator<Item = AgentKind>) -> Self {
        Self {
            accepted: agents.into_iter().collect(),
        }
    }

    /// Validate the payload at `index` of a submission
    ///
    /// Checks, in order:
    /// 1. `agent_id` is a string naming an accepted agent
    /// 2. `metadata` is an object with a boolean `success`
    /// 3. failed agents carry a non-empty `error_message`
    /// 4. timing fields are well-formed
    /// 5. `execution_results` is a non-null object
    pub fn validate(&self, index: usize, payload: &Value) -> Result<AgentResult, ValidationError> {
        let Some(object) = payload.as_object() else {
            return Err(ValidationError::new(
                index,
                ErrorKind::UnknownAgent,
                "agent result is not an object, so agent_id is missing",
            ));
        };

        let agent_id = self.agent_kind(index, object)?;
        let reject = |kind: ErrorKind, message: String| {
            ValidationError::new(index, kind, message).for_agent(agent_id.as_str())
        };

        let metadata = object
            .get("metadata")
            .and_then(Value::as_object)
            .ok_or_else(|| reject(ErrorKind::MalformedMetadata, "metadata is missing".into()))?;
        let metadata = parse_metadata(metadata).map_err(|(kind, message)| reject(kind, message))?;

        let execution_results = match object.get("execution_results") {
            Some(Value::Object(results)) => {
                ExecutionResults::from_object(agent_id, results.clone())
            }
            Some(Value::Null) | None => {
                return Err(reject(
                    ErrorKind::MalformedResults,
                    "execution_results is missing".into(),
                ))
            }
            Some(_) => {
                return Err(reject(
                    ErrorKind::MalformedResults,
                    "execution_results must be an object".into(),
                ))
            }
        };

        let agent_name = object
            .get("agent_name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map_or_else(|| agent_id.display_name().to_string(), str::to_string);

        Ok(AgentResult {
            agent_id,
            agent_name,
            execution_results,
            metadata,
        })
    }

    fn agent_kind(&self, index: usize, object: &Map<String, Value>) -> Result<AgentKind, ValidationError> {
        let raw = match object.get("agent_id") {
            Some(Value::String(raw)) => raw,
            Some(_) => {
                return Err(ValidationError::new(
                    index,
                    ErrorKind::UnknownAgent,
                    "agent_id must be a string",
                ))
            }
            None => {
                return Err(ValidationError::new(
                    index,
                    ErrorKind::UnknownAgent,
                    "agent_id is missing",
                ))
            }
        };

        match raw.parse::<AgentKind>() {
            Ok(kind) if self.accepted.contains(&kind) => Ok(kind),
            Ok(kind) => Err(ValidationError::new(
                index,
                ErrorKind::UnknownAgent,
                format!("agent id '{kind}' is not enabled"),
            )
            .for_agent(raw.as_str())),
            Err(e) => Err(ValidationError::new(index, ErrorKind::UnknownAgent, e.to_string())
                .for_agent(raw.as_str())),
        }
    }
}

impl Default for AgentResultValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate one payload against the full set of known agents
pub fn validate(payload: &Value) -> Result<AgentResult, ValidationError> {
    AgentResultValidator::new().validate(0, payload)
}

type FieldError = (ErrorKind, String);

fn parse_metadata(metadata: &Map<String, Value>) -> Result<AgentMetadata, FieldError> {
    let malformed = |message: &str| (ErrorKind::MalformedMetadata, message.to_string());

    let success = metadata
        .get("success")
        .and_then(Value::as_bool)
        .ok_or_else(|| malformed("metadata.success must be a boolean"))?;

    let error_message = match metadata.get("error_message") {
        None | Some(Value::Null) => None,
        Some(Value::String(message)) => Some(message.clone()),
        Some(_) => return Err(malformed("metadata.error_message must be a string")),
    };
    if !success && error_message.as_deref().map_or(true, |m| m.trim().is_empty()) {
        return Err((
            ErrorKind::MissingErrorDetail,
            "metadata.error_message is required when success is false".to_string(),
        ));
    }

    let execution_time_ms = metadata
        .get("execution_time_ms")
        .and_then(non_negative_integer)
        .ok_or_else(|| malformed("metadata.execution_time_ms must be a non-negative integer"))?;

    let timestamp = metadata
        .get("timestamp")
        .and_then(iso_timestamp)
        .ok_or_else(|| malformed("metadata.timestamp must be an ISO-8601 timestamp"))?;

    let started_at = optional(metadata, "started_at", iso_timestamp)
        .map_err(|()| malformed("metadata.started_at must be an ISO-8601 timestamp"))?;
    let completed_at = optional(metadata, "completed_at", iso_timestamp)
        .map_err(|()| malformed("metadata.completed_at must be an ISO-8601 timestamp"))?;
    if let (Some(started), Some(completed)) = (started_at, completed_at) {
        if completed < started {
            return Err(malformed("metadata.completed_at is before started_at"));
        }
    }

    let progress_percentage = optional(metadata, "progress_percentage", |v| {
        v.as_f64().filter(|p| (0.0..=100.0).contains(p))
    })
    .map_err(|()| malformed("metadata.progress_percentage must be between 0 and 100"))?;

    let retry_count = optional(metadata, "retry_count", |v| {
        non_negative_integer(v).and_then(|n| u32::try_from(n).ok())
    })
    .map_err(|()| malformed("metadata.retry_count must be a non-negative integer"))?;

    Ok(AgentMetadata {
        execution_time_ms,
        timestamp,
        success,
        error_message,
        started_at,
        completed_at,
        progress_percentage,
        retry_count,
    })
}

/// Absent and null are `Ok(None)`; present but unparseable is `Err(())`
fn optional<T>(
    object: &Map<String, Value>,
    key: &str,
    parse: impl Fn(&Value) -> Option<T>,
) -> Result<Option<T>, ()> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse(value).map(Some).ok_or(()),
    }
}

/// Accepts JSON integers and integral floats (`500.0`)
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_negative_integer(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn iso_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(agent_id: &str, metadata: Value) -> Value {
        json!({
            "agent_id": agent_id,
            "agent_name": "Test Agent",
            "execution_results": {"summary": "ok"},
            "metadata": metadata,
        })
    }

    fn ok_metadata() -> Value {
        json!({"success": true, "execution_time_ms": 500, "timestamp": "2024-01-01T00:00:00Z"})
    }

    #[test]
    fn accepts_well_formed_result() {
        let result = validate(&payload("content_review", ok_metadata())).unwrap();

        assert_eq!(result.agent_id, AgentKind::ContentReview);
        assert_eq!(result.agent_name, "Test Agent");
        assert_eq!(result.metadata.execution_time_ms, 500);
        assert!(result.succeeded());
    }

    #[test]
    fn rejects_unknown_agent() {
        let err = validate(&payload("not_a_real_agent", ok_metadata())).unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnknownAgent);
        assert_eq!(err.agent_id.as_deref(), Some("not_a_real_agent"));
        assert!(err.to_string().contains("not_a_real_agent"));
    }

    #[test]
    fn rejects_missing_or_non_string_agent_id() {
        let missing = json!({"metadata": ok_metadata(), "execution_results": {}});
        assert_eq!(validate(&missing).unwrap_err().kind, ErrorKind::UnknownAgent);

        let numeric = json!({"agent_id": 7, "metadata": ok_metadata(), "execution_results": {}});
        assert_eq!(validate(&numeric).unwrap_err().kind, ErrorKind::UnknownAgent);

        assert_eq!(validate(&json!("geo_audit")).unwrap_err().kind, ErrorKind::UnknownAgent);
    }

    #[test]
    fn rejects_agent_outside_enabled_set() {
        let validator = AgentResultValidator::with_agents([AgentKind::GeoAudit]);
        let err = validator
            .validate(1, &payload("content_review", ok_metadata()))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::UnknownAgent);
        assert_eq!(err.index, 1);
    }

    #[test]
    fn rejects_missing_metadata_and_non_boolean_success() {
        let no_metadata = json!({"agent_id": "geo_audit", "execution_results": {}});
        assert_eq!(
            validate(&no_metadata).unwrap_err().kind,
            ErrorKind::MalformedMetadata
        );

        let stringly = payload(
            "geo_audit",
            json!({"success": "true", "execution_time_ms": 1, "timestamp": "2024-01-01T00:00:00Z"}),
        );
        assert_eq!(validate(&stringly).unwrap_err().kind, ErrorKind::MalformedMetadata);
    }

    #[test]
    fn failed_agent_requires_error_detail() {
        let missing = payload(
            "geo_audit",
            json!({"success": false, "execution_time_ms": 200, "timestamp": "2024-01-01T00:00:01Z"}),
        );
        assert_eq!(validate(&missing).unwrap_err().kind, ErrorKind::MissingErrorDetail);

        let blank = payload(
            "geo_audit",
            json!({"success": false, "error_message": "  ", "execution_time_ms": 200, "timestamp": "2024-01-01T00:00:01Z"}),
        );
        assert_eq!(validate(&blank).unwrap_err().kind, ErrorKind::MissingErrorDetail);

        let present = payload(
            "geo_audit",
            json!({"success": false, "error_message": "timeout", "execution_time_ms": 200, "timestamp": "2024-01-01T00:00:01Z"}),
        );
        let result = validate(&present).unwrap();
        assert!(!result.succeeded());
        assert_eq!(result.metadata.error_message.as_deref(), Some("timeout"));
    }

    #[test]
    fn rejects_malformed_timing() {
        let negative = payload(
            "geo_audit",
            json!({"success": true, "execution_time_ms": -5, "timestamp": "2024-01-01T00:00:00Z"}),
        );
        assert_eq!(validate(&negative).unwrap_err().kind, ErrorKind::MalformedMetadata);

        let bad_timestamp = payload(
            "geo_audit",
            json!({"success": true, "execution_time_ms": 5, "timestamp": "yesterday"}),
        );
        assert_eq!(validate(&bad_timestamp).unwrap_err().kind, ErrorKind::MalformedMetadata);

        let reversed = payload(
            "geo_audit",
            json!({
                "success": true,
                "execution_time_ms": 5,
                "timestamp": "2024-01-01T00:00:00Z",
                "started_at": "2024-01-01T00:00:10Z",
                "completed_at": "2024-01-01T00:00:05Z",
            }),
        );
        assert_eq!(validate(&reversed).unwrap_err().kind, ErrorKind::MalformedMetadata);
    }

    #[test]
    fn accepts_integral_float_execution_time() {
        let result = validate(&payload(
            "geo_audit",
            json!({"success": true, "execution_time_ms": 1500.0, "timestamp": "2024-01-01T00:00:00Z"}),
        ))
        .unwrap();
        assert_eq!(result.metadata.execution_time_ms, 1500);
    }

    #[test]
    fn rejects_out_of_range_progress() {
        let err = validate(&payload(
            "geo_audit",
            json!({"success": true, "execution_time_ms": 1, "timestamp": "2024-01-01T00:00:00Z", "progress_percentage": 140}),
        ))
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedMetadata);
    }

    #[test]
    fn execution_results_must_be_an_object() {
        let mut value = payload("geo_audit", ok_metadata());
        value["execution_results"] = Value::Null;
        assert_eq!(validate(&value).unwrap_err().kind, ErrorKind::MalformedResults);

        value["execution_results"] = json!([1, 2]);
        assert_eq!(validate(&value).unwrap_err().kind, ErrorKind::MalformedResults);
    }

    #[test]
    fn agent_name_defaults_to_display_name() {
        let value = json!({
            "agent_id": "roadmap_generator",
            "execution_results": {},
            "metadata": ok_metadata(),
        });
        let result = validate(&value).unwrap();
        assert_eq!(result.agent_name, "Roadmap Generator");
    }
}
