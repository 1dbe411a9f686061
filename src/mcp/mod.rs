//! Model Context Protocol boundary: tool server, client and executor bridge.

pub mod bridge;
pub mod client;
pub mod endpoint;
pub mod server;

pub use bridge::McpOperationExecutor;
pub use client::{McpClient, McpToolCallResult};
pub use endpoint::McpEndpoint;
pub use server::MathServer;
