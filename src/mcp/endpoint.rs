//! Where the tool server lives.

use std::fmt;

use crate::error::MathChatError;

/// Address of an MCP tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpEndpoint {
    /// Streamable HTTP, e.g. `http://127.0.0.1:8000/mcp`.
    StreamableHttp { url: String },
    /// A child process speaking MCP over stdin/stdout.
    Stdio { command: String, args: Vec<String> },
}

impl McpEndpoint {
    pub fn http(url: impl Into<String>) -> Self {
        Self::StreamableHttp { url: url.into() }
    }

    /// Parse a whitespace-separated command line such as `mathchat serve --stdio`.
    pub fn stdio_command_line(command_line: &str) -> Result<Self, MathChatError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let command = parts.next().ok_or_else(|| {
            MathChatError::Configuration("stdio command must not be empty".into())
        })?;
        Ok(Self::Stdio {
            command,
            args: parts.collect(),
        })
    }
}

impl fmt::Display for McpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamableHttp { url } => write!(f, "{url}"),
            Self::Stdio { command, args } if args.is_empty() => write!(f, "stdio:{command}"),
            Self::Stdio { command, args } => write!(f, "stdio:{command} {}", args.join(" ")),
        }
    }
}
