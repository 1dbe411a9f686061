//! Message and operation exchange types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OperationErrorKind;

/// One entry of a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Operations the assistant asked for in this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<OperationRequest>,
    /// Present only on [`Role::Tool`] messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    /// Create an assistant message carrying a final answer.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    /// Create an assistant message that requests operations.
    pub fn assistant_with_requests(
        text: impl Into<String>,
        requests: Vec<OperationRequest>,
    ) -> Self {
        Self {
            requests,
            ..Self::plain(Role::Assistant, text)
        }
    }

    /// Create a tool-result message answering one request.
    pub fn tool_result(result: OperationResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.content_text(),
            requests: Vec::new(),
            result: Some(result),
            timestamp: Some(Utc::now()),
        }
    }

    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            requests: Vec::new(),
            result: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Whether this message still expects operation results.
    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// An operation the decision-maker wants executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl OperationRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Structured reason an operation produced no value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationFailure {
    pub kind: OperationErrorKind,
    pub message: String,
}

impl OperationFailure {
    pub fn new(kind: OperationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(
            OperationErrorKind::UnknownOperation,
            format!("Operation '{name}' does not exist"),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::InvalidArguments, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(OperationErrorKind::PreconditionFailed, message)
    }
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// `ok` with a value, or `error` with a failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum OperationOutcome {
    Ok(serde_json::Value),
    Error(OperationFailure),
}

/// The resolution of exactly one [`OperationRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationResult {
    pub request_id: String,
    pub operation: String,
    pub outcome: OperationOutcome,
}

impl OperationResult {
    pub fn ok(request: &OperationRequest, value: serde_json::Value) -> Self {
        Self {
            request_id: request.id.clone(),
            operation: request.name.clone(),
            outcome: OperationOutcome::Ok(value),
        }
    }

    pub fn error(request: &OperationRequest, failure: OperationFailure) -> Self {
        Self {
            request_id: request.id.clone(),
            operation: request.name.clone(),
            outcome: OperationOutcome::Error(failure),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, OperationOutcome::Error(_))
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            OperationOutcome::Ok(value) => Some(value),
            OperationOutcome::Error(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&OperationFailure> {
        match &self.outcome {
            OperationOutcome::Ok(_) => None,
            OperationOutcome::Error(failure) => Some(failure),
        }
    }

    /// Text shown to the decision-maker for this result.
    pub fn content_text(&self) -> String {
        match &self.outcome {
            OperationOutcome::Ok(value) => match value {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            OperationOutcome::Error(failure) => serde_json::json!({
                "error": failure.kind,
                "message": failure.message,
            })
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_result_message_carries_result_and_text() {
        let request = OperationRequest::new("call_1", "add", json!({"a": 5, "b": 7}));
        let msg = Message::tool_result(OperationResult::ok(&request, json!(12)));

        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content, "12");
        assert_eq!(msg.result.as_ref().unwrap().request_id, "call_1");
    }

    #[test]
    fn error_outcome_serializes_with_status_tag() {
        let request = OperationRequest::new("call_2", "divide", json!({"a": 1, "b": 0}));
        let result = OperationResult::error(
            &request,
            OperationFailure::precondition_failed("Division by zero is not allowed."),
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["outcome"]["status"], "error");
        assert_eq!(value["outcome"]["detail"]["kind"], "precondition_failed");
        assert!(result.content_text().contains("Division by zero"));
    }

    #[test]
    fn string_values_are_passed_through_verbatim() {
        let request = OperationRequest::new("call_3", "echo", json!({}));
        let result = OperationResult::ok(&request, json!("plain text"));
        assert_eq!(result.content_text(), "plain text");
    }
}
