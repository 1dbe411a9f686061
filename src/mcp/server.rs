//! MCP tool server exposing an operation registry.

use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use tracing::{debug, info};

use crate::error::MathChatError;
use crate::executor::LocalExecutor;
use crate::operations::OperationRegistry;
use crate::types::{OperationOutcome, OperationRequest};

pub const DEFAULT_SERVER_NAME: &str = "Math";

/// Serves the operations of a registry as MCP tools.
///
/// Successful calls return `{"result": value}` as structured content.
/// Operation failures return `isError: true` with
/// `{"kind": "<kind>", "message": "..."}` so clients can recover the kind.
#[derive(Debug, Clone)]
pub struct MathServer {
    name: String,
    executor: Arc<LocalExecutor>,
}

impl MathServer {
    pub fn new(registry: OperationRegistry) -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            executor: Arc::new(LocalExecutor::new(registry)),
        }
    }

    pub fn builtin() -> Self {
        Self::new(OperationRegistry::builtin())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serve over stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> Result<(), MathChatError> {
        info!(server = %self.name, "serving MCP over stdio");
        let running = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| MathChatError::transport(format!("MCP stdio server failed to start: {e}")))?;
        running
            .waiting()
            .await
            .map_err(|e| MathChatError::transport(format!("MCP stdio server task failed: {e}")))?;
        Ok(())
    }

    fn tools(&self) -> Vec<rmcp::model::Tool> {
        self.executor
            .registry()
            .iter()
            .map(|op| {
                rmcp::model::Tool::new(
                    op.name().to_string(),
                    op.description().to_string(),
                    Arc::new(op.parameters().as_object()),
                )
            })
            .collect()
    }

    fn call(&self, request: CallToolRequestParams) -> CallToolResult {
        let arguments = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);
        let request = OperationRequest::new(
            uuid::Uuid::new_v4().to_string(),
            request.name.to_string(),
            arguments,
        );
        let result = self.executor.run(&request);
        debug!(operation = %request.name, is_error = result.is_error(), "tool call handled");

        match result.outcome {
            OperationOutcome::Ok(value) => CallToolResult::structured(serde_json::json!({
                "result": value,
            })),
            OperationOutcome::Error(failure) => {
                let mut error = CallToolResult::structured_error(serde_json::json!({
                    "kind": failure.kind,
                    "message": &failure.message,
                }));
                error.content = vec![rmcp::model::Content::text(failure.message)];
                error
            }
        }
    }
}

impl Default for MathServer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ServerHandler for MathServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Arithmetic tools: add, multiply, divide, square_root, factorial.".into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(request))
    }
}

#[cfg(feature = "cli")]
pub mod http {
    //! Streamable HTTP hosting through axum.

    use std::net::SocketAddr;

    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    };
    use tokio_util::sync::CancellationToken;
    use tracing::info;

    use super::MathServer;
    use crate::error::MathChatError;

    /// Path the MCP service is mounted under.
    pub const MCP_PATH: &str = "/mcp";

    /// Build an axum router serving `server` under [`MCP_PATH`].
    pub fn router(server: MathServer, shutdown: CancellationToken) -> axum::Router {
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                cancellation_token: shutdown,
                ..Default::default()
            },
        );
        axum::Router::new().nest_service(MCP_PATH, service)
    }

    /// Bind `addr` and serve until `shutdown` fires. Returns the bound address
    /// through `on_bound` before accepting connections.
    pub async fn serve(
        server: MathServer,
        addr: SocketAddr,
        shutdown: CancellationToken,
        on_bound: impl FnOnce(SocketAddr),
    ) -> Result<(), MathChatError> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!(server = %server.name(), addr = %local, path = MCP_PATH, "serving MCP over streamable HTTP");
        on_bound(local);

        let app = router(server, shutdown.child_token());
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }
}
