//! MCP client for discovering and calling operations on a tool server.

use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientInfo, Content, JsonObject, ResourceContents},
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError, ServiceExt},
    transport::{IntoTransport, StreamableHttpClientTransport, TokioChildProcess},
};
use tracing::{debug, info};

use super::endpoint::McpEndpoint;
use crate::error::MathChatError;
use crate::operations::{OperationParameters, OperationSpec};

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

/// Raw outcome of one `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolCallResult {
    pub structured_content: Option<serde_json::Value>,
    pub text_content: Option<String>,
    pub is_error: bool,
}

/// Connected MCP session.
///
/// Calls take `&self`, so one client can serve a whole batch concurrently.
pub struct McpClient {
    session: McpRunningService,
}

impl McpClient {
    /// Connect and complete the MCP handshake.
    pub async fn connect(endpoint: &McpEndpoint) -> Result<Self, MathChatError> {
        info!(%endpoint, "connecting to MCP server");
        match endpoint {
            McpEndpoint::StreamableHttp { url } => {
                Self::connect_transport(StreamableHttpClientTransport::from_uri(url.as_str())).await
            }
            McpEndpoint::Stdio { command, args } => {
                let mut cmd = tokio::process::Command::new(command);
                cmd.args(args);
                let transport = TokioChildProcess::new(cmd).map_err(|e| {
                    MathChatError::transport(format!("failed to spawn '{command}': {e}"))
                })?;
                Self::connect_transport(transport).await
            }
        }
    }

    /// Connect over any rmcp transport (HTTP, child process, in-memory pipe).
    pub async fn connect_transport<T, E, A>(transport: T) -> Result<Self, MathChatError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_running_service_result(ClientInfo::default().into_dyn().serve(transport).await)
    }

    /// Convert an rmcp initialization result into a client.
    pub fn from_running_service_result(
        result: Result<McpRunningService, ClientInitializeError>,
    ) -> Result<Self, MathChatError> {
        result
            .map(|session| Self { session })
            .map_err(map_client_initialize_error)
    }

    /// Name the server reported during the handshake.
    pub fn server_name(&self) -> Option<&str> {
        self.session
            .peer_info()
            .map(|info| info.server_info.name.as_str())
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// List the server's tools as operation specs.
    pub async fn list_tools(&self) -> Result<Vec<OperationSpec>, MathChatError> {
        self.ensure_open()?;
        let tools = match self.session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                let page = self
                    .session
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e))?;
                page.tools
            }
            Err(e) => return Err(map_service_error("list_tools", e)),
        };
        debug!(count = tools.len(), "listed MCP tools");
        Ok(tools.into_iter().map(map_mcp_tool).collect())
    }

    /// Call a tool. A tool-level failure is an `Ok` result with `is_error` set.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<McpToolCallResult, MathChatError> {
        self.ensure_open()?;
        let result = self
            .session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| map_service_error("call_tool", e))?;
        Ok(map_call_result(result))
    }

    /// Shut the session down.
    pub async fn close(mut self) -> Result<(), MathChatError> {
        self.session
            .close()
            .await
            .map(|_| ())
            .map_err(|e| MathChatError::transport(format!("MCP session did not shut down: {e}")))
    }

    fn ensure_open(&self) -> Result<(), MathChatError> {
        if self.session.is_closed() {
            return Err(MathChatError::transport("MCP session is closed"));
        }
        Ok(())
    }
}

fn map_mcp_tool(tool: rmcp::model::Tool) -> OperationSpec {
    OperationSpec::new(
        tool.name.to_string(),
        tool.description.map(|d| d.to_string()).unwrap_or_default(),
        OperationParameters::from_schema(serde_json::Value::Object((*tool.input_schema).clone())),
    )
}

fn extract_text_content(content: &[Content]) -> Option<String> {
    let mut lines = Vec::new();
    for item in content {
        if let Some(text) = item.as_text() {
            lines.push(text.text.clone());
            continue;
        }
        if let Some(resource) = item.as_resource() {
            if let ResourceContents::TextResourceContents { text, .. } = &resource.resource {
                lines.push(text.clone());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_call_result(result: CallToolResult) -> McpToolCallResult {
    McpToolCallResult {
        text_content: extract_text_content(&result.content),
        structured_content: result.structured_content,
        is_error: result.is_error.unwrap_or(false),
    }
}

fn map_client_initialize_error(error: ClientInitializeError) -> MathChatError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            MathChatError::transport(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => MathChatError::transport(
            format!("MCP initialize transport error ({context}): {error}"),
        ),
        ClientInitializeError::JsonRpcError(error) => MathChatError::api(
            400,
            format!(
                "MCP initialize JSON-RPC error {}: {}",
                error.code.0, error.message
            ),
        ),
        ClientInitializeError::Cancelled => MathChatError::Cancelled,
        other => MathChatError::transport(format!("MCP initialize error: {other}")),
    }
}

/// Map an rmcp service error.
///
/// JSON-RPC errors returned by the server are not worth retrying and map to
/// a 400 `Api` error; everything on the wire maps to `Transport`.
fn map_service_error(context: &str, error: ServiceError) -> MathChatError {
    match error {
        ServiceError::McpError(error) => MathChatError::api(
            400,
            format!("{context}: MCP error {}: {}", error.code.0, error.message),
        ),
        ServiceError::TransportSend(error) => {
            MathChatError::transport(format!("{context}: MCP transport send failed: {error}"))
        }
        ServiceError::TransportClosed => {
            MathChatError::transport(format!("{context}: MCP transport closed"))
        }
        ServiceError::UnexpectedResponse => {
            MathChatError::transport(format!("{context}: unexpected MCP response"))
        }
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            MathChatError::transport(format!("{context}: MCP request cancelled{suffix}"))
        }
        ServiceError::Timeout { timeout } => MathChatError::Timeout(timeout.as_millis() as u64),
        other => MathChatError::transport(format!("{context}: MCP service error: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn map_mcp_tool_copies_fields() {
        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!("object"));
        let tool = rmcp::model::Tool::new("add", "Add two numbers", schema);

        let spec = map_mcp_tool(tool);
        assert_eq!(spec.name, "add");
        assert_eq!(spec.description, "Add two numbers");
        assert_eq!(spec.parameters.schema["type"], "object");
    }

    #[test]
    fn map_call_result_keeps_error_flag_and_payloads() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "Division by zero is not allowed." }],
            "structuredContent": { "kind": "precondition_failed" },
            "isError": true
        }))
        .unwrap();

        let mapped = map_call_result(result);
        assert!(mapped.is_error);
        assert_eq!(
            mapped.text_content.as_deref(),
            Some("Division by zero is not allowed.")
        );
        assert_eq!(mapped.structured_content.unwrap()["kind"], "precondition_failed");
    }

    #[test]
    fn map_service_error_transport_closed_is_retryable_transport() {
        let err = map_service_error("call_tool", ServiceError::TransportClosed);
        assert!(matches!(&err, MathChatError::Transport { message } if message.contains("closed")));
        assert!(err.is_retryable());
    }

    #[test]
    fn map_service_error_jsonrpc_is_not_retryable() {
        let err = map_service_error(
            "call_tool",
            ServiceError::McpError(rmcp::model::ErrorData::invalid_params("bad", None)),
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn map_service_error_timeout_maps_to_timeout_error() {
        let err = map_service_error(
            "call_tool",
            ServiceError::Timeout {
                timeout: Duration::from_millis(2750),
            },
        );
        assert!(matches!(err, MathChatError::Timeout(2750)));
    }

    #[test]
    fn initialize_jsonrpc_error_is_mapped() {
        let init_error = ClientInitializeError::JsonRpcError(
            rmcp::model::ErrorData::invalid_request("bad initialize payload", None),
        );
        let err = match McpClient::from_running_service_result(Err(init_error)) {
            Ok(_) => panic!("initialize error should be mapped"),
            Err(err) => err,
        };
        assert!(matches!(
            err,
            MathChatError::Api { message, .. } if message.contains("bad initialize payload")
        ));
    }
}
