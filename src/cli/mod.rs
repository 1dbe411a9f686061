//! CLI for mathchat.

pub mod session;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Ask questions that a language model answers with the help of math tools.
#[derive(Parser, Debug)]
#[command(name = "mathchat", version, about = "Math tool server and tool-calling chat client")]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the "Math" MCP tool server
    Serve(ServeArgs),
    /// Answer one question and exit
    Ask(AskArgs),
    /// Interactive session, one question per line
    Chat(SessionArgs),
    /// List the operations the tool server offers
    Tools(ConnectArgs),
}

/// Arguments for `mathchat serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address for the streamable HTTP endpoint (served under /mcp)
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Serve over stdin/stdout instead of HTTP
    #[arg(long, conflicts_with = "bind")]
    pub stdio: bool,
}

/// Where operations run.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// MCP server URL (defaults to config / MATHCHAT_MCP_URL)
    #[arg(long, conflicts_with_all = ["stdio_command", "local"])]
    pub server_url: Option<String>,

    /// Spawn the tool server as a child process speaking MCP over stdio
    #[arg(long, conflicts_with = "local")]
    pub stdio_command: Option<String>,

    /// Run operations in-process instead of over MCP
    #[arg(long)]
    pub local: bool,
}

/// Options shared by `ask` and `chat`.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Model name (defaults to config / MATHCHAT_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum decide calls per question
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// System prompt placed before each question
    #[arg(short, long)]
    pub system: Option<String>,

    /// Execute requested operations one at a time
    #[arg(long)]
    pub sequential: bool,
}

/// Arguments for `mathchat ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// The question
    pub query: String,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
