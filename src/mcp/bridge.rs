//! Bridge a remote MCP tool server into the [`OperationExecutor`] seam.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::{McpClient, McpToolCallResult};
use crate::error::{MathChatError, OperationErrorKind};
use crate::executor::OperationExecutor;
use crate::operations::{validate_arguments, OperationArguments, OperationSpec};
use crate::types::{OperationFailure, OperationRequest, OperationResult};
use crate::util::{with_timeout, RetryPolicy};

#[async_trait]
trait McpClientOps: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<OperationSpec>, MathChatError>;
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<McpToolCallResult, MathChatError>;
}

#[async_trait]
impl McpClientOps for McpClient {
    async fn list_tools(&self) -> Result<Vec<OperationSpec>, MathChatError> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<McpToolCallResult, MathChatError> {
        McpClient::call_tool(self, name, Some(arguments)).await
    }
}

/// Executes operations on a remote tool server.
///
/// The catalog is discovered once and frozen; a name missing from it is
/// answered locally with `UnknownOperation`, and arguments are checked
/// against the discovered schema before anything goes over the wire.
pub struct McpOperationExecutor {
    client: Arc<dyn McpClientOps>,
    catalog: Vec<OperationSpec>,
    index: HashMap<String, usize>,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl McpOperationExecutor {
    /// List the server's tools and freeze them as this session's catalog.
    pub async fn discover(client: McpClient, retry_policy: RetryPolicy) -> Result<Self, MathChatError> {
        Self::discover_with(Arc::new(client), retry_policy).await
    }

    async fn discover_with(
        client: Arc<dyn McpClientOps>,
        retry_policy: RetryPolicy,
    ) -> Result<Self, MathChatError> {
        let catalog = retry_policy
            .execute(|| client.list_tools())
            .await
            .map_err(into_transport)?;
        info!(count = catalog.len(), "discovered MCP operations");

        let mut index = HashMap::with_capacity(catalog.len());
        for (i, spec) in catalog.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(MathChatError::transport(format!(
                    "tool server advertised '{}' more than once",
                    spec.name
                )));
            }
        }

        Ok(Self {
            client,
            catalog,
            index,
            retry_policy,
            timeout: Duration::from_secs(60),
        })
    }

    /// Per-attempt timeout for remote calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&OperationSpec> {
        self.index.get(name).map(|&i| &self.catalog[i])
    }

    async fn call_remote(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<McpToolCallResult, MathChatError> {
        self.retry_policy
            .execute(|| with_timeout(self.timeout, self.client.call_tool(name, arguments.clone())))
            .await
            .map_err(into_transport)
    }
}

#[async_trait]
impl OperationExecutor for McpOperationExecutor {
    fn catalog(&self) -> Vec<OperationSpec> {
        self.catalog.clone()
    }

    async fn execute(&self, request: &OperationRequest) -> Result<OperationResult, MathChatError> {
        let Some(spec) = self.lookup(&request.name) else {
            return Ok(OperationResult::error(
                request,
                OperationFailure::unknown_operation(&request.name),
            ));
        };

        let arguments = match OperationArguments::parse(request.arguments.clone()) {
            Ok(args) => args,
            Err(failure) => return Ok(OperationResult::error(request, failure)),
        };
        if let Err(message) = validate_arguments(arguments.raw(), &spec.parameters.schema) {
            return Ok(OperationResult::error(
                request,
                OperationFailure::invalid_arguments(message),
            ));
        }
        let serde_json::Value::Object(arguments) = arguments.into_raw() else {
            return Ok(OperationResult::error(
                request,
                OperationFailure::invalid_arguments("arguments must be a JSON object"),
            ));
        };

        debug!(operation = %request.name, request_id = %request.id, "calling remote operation");
        let result = self.call_remote(&request.name, arguments).await?;
        Ok(map_remote_result(request, result))
    }
}

/// Turn a `tools/call` answer back into an operation result.
fn map_remote_result(request: &OperationRequest, result: McpToolCallResult) -> OperationResult {
    if result.is_error {
        let structured = result.structured_content.as_ref();
        let kind = structured
            .and_then(|v| v.get("kind"))
            .and_then(|k| k.as_str())
            .and_then(|k| OperationErrorKind::from_str(k).ok())
            .unwrap_or(OperationErrorKind::PreconditionFailed);
        let message = structured
            .and_then(|v| v.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .or(result.text_content)
            .unwrap_or_else(|| "tool server reported an error".into());
        return OperationResult::error(request, OperationFailure::new(kind, message));
    }

    let value = match result.structured_content {
        Some(serde_json::Value::Object(mut map)) if map.contains_key("result") => {
            map.remove("result").unwrap_or(serde_json::Value::Null)
        }
        Some(other) => other,
        None => result
            .text_content
            .map(|text| serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
            .unwrap_or(serde_json::Value::Null),
    };
    OperationResult::ok(request, value)
}

fn into_transport(error: MathChatError) -> MathChatError {
    match error {
        MathChatError::Transport { .. } | MathChatError::Cancelled => error,
        other => MathChatError::transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::OperationRegistry;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockClientOps {
        catalog: Vec<OperationSpec>,
        calls: AtomicUsize,
        fail_calls: usize,
        reply: McpToolCallResult,
    }

    impl MockClientOps {
        fn new(reply: McpToolCallResult) -> Self {
            Self {
                catalog: OperationRegistry::builtin().specs(),
                calls: AtomicUsize::new(0),
                fail_calls: 0,
                reply,
            }
        }
    }

    #[async_trait]
    impl McpClientOps for MockClientOps {
        async fn list_tools(&self) -> Result<Vec<OperationSpec>, MathChatError> {
            Ok(self.catalog.clone())
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: serde_json::Map<String, serde_json::Value>,
        ) -> Result<McpToolCallResult, MathChatError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_calls {
                return Err(MathChatError::transport("connection reset"));
            }
            Ok(self.reply.clone())
        }
    }

    fn ok_reply(value: serde_json::Value) -> McpToolCallResult {
        McpToolCallResult {
            structured_content: Some(json!({ "result": value })),
            text_content: None,
            is_error: false,
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            multiplier: 1.0,
        }
    }

    async fn executor(mock: MockClientOps, retry: RetryPolicy) -> (Arc<MockClientOps>, McpOperationExecutor) {
        let mock = Arc::new(mock);
        let executor = McpOperationExecutor::discover_with(mock.clone(), retry)
            .await
            .unwrap();
        (mock, executor)
    }

    #[tokio::test]
    async fn unknown_and_invalid_requests_never_reach_the_server() {
        let (mock, executor) = executor(MockClientOps::new(ok_reply(json!(0))), fast_retry(1)).await;

        let unknown = executor
            .execute(&OperationRequest::new("c1", "modulo", json!({})))
            .await
            .unwrap();
        assert_eq!(unknown.failure().unwrap().kind, OperationErrorKind::UnknownOperation);

        let invalid = executor
            .execute(&OperationRequest::new("c2", "add", json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(invalid.failure().unwrap().kind, OperationErrorKind::InvalidArguments);

        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn structured_result_is_unwrapped() {
        let (_, executor) = executor(MockClientOps::new(ok_reply(json!(12))), fast_retry(1)).await;
        let result = executor
            .execute(&OperationRequest::new("c1", "add", json!({"a": 5, "b": 7})))
            .await
            .unwrap();
        assert_eq!(result.value(), Some(&json!(12)));
    }

    #[tokio::test]
    async fn transient_transport_errors_are_retried() {
        let mut mock = MockClientOps::new(ok_reply(json!(3.0)));
        mock.fail_calls = 2;
        let (mock, executor) = executor(mock, fast_retry(3)).await;

        let result = executor
            .execute(&OperationRequest::new("c1", "divide", json!({"a": 6, "b": 2})))
            .await
            .unwrap();
        assert_eq!(result.value(), Some(&json!(3.0)));
        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal_transport_errors() {
        let mut mock = MockClientOps::new(ok_reply(json!(0)));
        mock.fail_calls = usize::MAX;
        let (_, executor) = executor(mock, fast_retry(2)).await;

        let err = executor
            .execute(&OperationRequest::new("c1", "add", json!({"a": 1, "b": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, MathChatError::Transport { .. }));
    }

    #[test]
    fn error_result_recovers_kind() {
        let request = OperationRequest::new("c1", "square_root", json!({"x": -9}));
        let result = map_remote_result(
            &request,
            McpToolCallResult {
                structured_content: Some(json!({
                    "kind": "precondition_failed",
                    "message": "Cannot take square root of a negative number.",
                })),
                text_content: None,
                is_error: true,
            },
        );
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, OperationErrorKind::PreconditionFailed);
        assert_eq!(failure.message, "Cannot take square root of a negative number.");
    }

    #[test]
    fn untyped_error_defaults_to_precondition_failed() {
        let request = OperationRequest::new("c1", "divide", json!({"a": 1, "b": 0}));
        let result = map_remote_result(
            &request,
            McpToolCallResult {
                structured_content: None,
                text_content: Some("Division by zero is not allowed.".into()),
                is_error: true,
            },
        );
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, OperationErrorKind::PreconditionFailed);
        assert_eq!(failure.message, "Division by zero is not allowed.");
    }

    #[test]
    fn text_only_result_is_parsed_as_json_when_possible() {
        let request = OperationRequest::new("c1", "add", json!({"a": 5, "b": 7}));
        let result = map_remote_result(
            &request,
            McpToolCallResult {
                structured_content: None,
                text_content: Some("12".into()),
                is_error: false,
            },
        );
        assert_eq!(result.value(), Some(&json!(12)));
    }
}
