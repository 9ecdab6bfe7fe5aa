//! Request body decoding
//!
//! Only the envelope is checked here. The agent entries are handed to the
//! aggregator untouched.

use crate::error::IngestError;
use chrono::{DateTime, Utc};
use osa_core::WorkflowContext;
use serde_json::{Map, Value};

/// A decoded workflow submission
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSubmission {
    pub workflow_id: String,
    pub agent_data: Vec<Value>,
    pub context: WorkflowContext,
}

impl WorkflowSubmission {
    /// Decode raw body bytes
    ///
    /// # Errors
    /// - `MalformedBody` if the bytes are not a JSON object
    /// - `MissingField` if `workflow_id` is not a non-empty string or
    ///   `agent_data` is not a non-empty array
    /// - `InvalidField` if an optional field has the wrong shape
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IngestError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| IngestError::MalformedBody(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode a parsed body
    ///
    /// # Errors
    /// See [`WorkflowSubmission::from_slice`].
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        let Value::Object(mut body) = value else {
            return Err(IngestError::MalformedBody(
                "expected a JSON object".to_string(),
            ));
        };

        let workflow_id = match body.remove("workflow_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            _ => return Err(IngestError::MissingField("workflow_id".to_string())),
        };
        let agent_data = match body.remove("agent_data") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(IngestError::MissingField("agent_data".to_string())),
        };

        let context = WorkflowContext {
            client_name: optional_string(&body, "client_name")?,
            business_objectives: objectives(&body)?,
            workflow_timestamp: timestamp(&body)?,
            workflow_execution_time_ms: execution_time(&body)?,
            workflow_metadata: match body.remove("workflow_metadata") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map,
                Some(_) => return Err(invalid("workflow_metadata", "must be an object")),
            },
        };

        Ok(Self {
            workflow_id,
            agent_data,
            context,
        })
    }
}

fn invalid(field: &str, message: &str) -> IngestError {
    IngestError::InvalidField {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn present<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    body.get(field).filter(|v| !v.is_null())
}

fn optional_string(body: &Map<String, Value>, field: &str) -> Result<Option<String>, IngestError> {
    match present(body, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(field, "must be a string")),
    }
}

fn objectives(body: &Map<String, Value>) -> Result<Vec<String>, IngestError> {
    match present(body, "business_objectives") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("business_objectives", "must be an array of strings"))
            })
            .collect(),
        Some(_) => Err(invalid("business_objectives", "must be an array of strings")),
    }
}

fn timestamp(body: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, IngestError> {
    optional_string(body, "workflow_timestamp")?
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| invalid("workflow_timestamp", "must be an ISO-8601 timestamp"))
        })
        .transpose()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn execution_time(body: &Map<String, Value>) -> Result<Option<u64>, IngestError> {
    let Some(value) = present(body, "workflow_execution_time_ms") else {
        return Ok(None);
    };
    if let Some(ms) = value.as_u64() {
        return Ok(Some(ms));
    }
    match value.as_f64() {
        // fractional milliseconds are rounded
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(Some(ms.round() as u64)),
        _ => Err(invalid(
            "workflow_execution_time_ms",
            "must be a non-negative number",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_json_is_malformed() {
        let err = WorkflowSubmission::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.code(), "malformed_body");

        let err = WorkflowSubmission::from_slice(b"[1, 2]").unwrap_err();
        assert_eq!(err.code(), "malformed_body");
    }

    #[test]
    fn required_fields() {
        let cases = [
            (json!({"agent_data": [{}]}), "workflow_id"),
            (json!({"workflow_id": "", "agent_data": [{}]}), "workflow_id"),
            (json!({"workflow_id": 7, "agent_data": [{}]}), "workflow_id"),
            (json!({"workflow_id": "wf"}), "agent_data"),
            (json!({"workflow_id": "wf", "agent_data": []}), "agent_data"),
            (json!({"workflow_id": "wf", "agent_data": {"a": 1}}), "agent_data"),
        ];

        for (body, field) in cases {
            let err = WorkflowSubmission::from_value(body).unwrap_err();
            assert_eq!(err, IngestError::MissingField(field.to_string()));
        }
    }

    #[test]
    fn optional_context_fields() {
        let submission = WorkflowSubmission::from_value(json!({
            "workflow_id": "wf_ctx",
            "agent_data": [{}],
            "client_name": "Acme",
            "business_objectives": ["grow"],
            "workflow_timestamp": "2024-03-01T10:00:00+02:00",
            "workflow_execution_time_ms": 1234.4,
            "workflow_metadata": {"source": "opal"},
        }))
        .unwrap();

        let context = submission.context;
        assert_eq!(context.client_name.as_deref(), Some("Acme"));
        assert_eq!(context.business_objectives, vec!["grow"]);
        assert_eq!(
            context.workflow_timestamp.unwrap().to_rfc3339(),
            "2024-03-01T08:00:00+00:00"
        );
        assert_eq!(context.workflow_execution_time_ms, Some(1234));
        assert_eq!(context.workflow_metadata["source"], json!("opal"));
    }

    #[test]
    fn wrongly_shaped_optional_field_is_invalid() {
        let err = WorkflowSubmission::from_value(json!({
            "workflow_id": "wf",
            "agent_data": [{}],
            "workflow_execution_time_ms": -5,
        }))
        .unwrap_err();
        assert_eq!(err.code(), "invalid_field");
        assert_eq!(err.status_code().as_u16(), 400);
    }
}
