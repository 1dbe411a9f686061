//! Wiring a client session together from config and flags.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use super::{ConnectArgs, SessionArgs};
use crate::config::MathChatConfig;
use crate::control_loop::ControlLoop;
use crate::decision::{DecisionMaker, OpenAiDecisionMaker};
use crate::error::MathChatError;
use crate::executor::{LocalExecutor, OperationExecutor};
use crate::mcp::{McpClient, McpEndpoint, McpOperationExecutor};

/// Fold CLI flags over the loaded config.
pub fn apply_session_args(mut config: MathChatConfig, args: &SessionArgs) -> MathChatConfig {
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(max) = args.max_iterations {
        config.max_iterations = max;
    }
    if let Some(system) = &args.system {
        config.system_prompt = Some(system.clone());
    }
    if args.sequential {
        config.parallel_operations = false;
    }
    if let Some(url) = &args.connect.server_url {
        config.mcp_url = url.clone();
    }
    config
}

/// Remote endpoint selected by flags, or `None` for in-process execution.
pub fn endpoint_for(
    connect: &ConnectArgs,
    config: &MathChatConfig,
) -> Result<Option<McpEndpoint>, MathChatError> {
    if connect.local {
        return Ok(None);
    }
    if let Some(command_line) = &connect.stdio_command {
        return McpEndpoint::stdio_command_line(command_line).map(Some);
    }
    let url = connect.server_url.as_deref().unwrap_or(&config.mcp_url);
    Ok(Some(McpEndpoint::http(url)))
}

/// Connect (or not) and discover the operation catalog.
pub async fn build_executor(
    connect: &ConnectArgs,
    config: &MathChatConfig,
) -> Result<Arc<dyn OperationExecutor>, MathChatError> {
    match endpoint_for(connect, config)? {
        None => Ok(Arc::new(LocalExecutor::builtin())),
        Some(endpoint) => {
            let client = McpClient::connect(&endpoint).await?;
            let executor = McpOperationExecutor::discover(client, config.retry.clone())
                .await?
                .with_timeout(Duration::from_millis(config.request_timeout_ms));
            Ok(Arc::new(executor))
        }
    }
}

/// Assemble a control loop with the OpenAI decision-maker.
pub async fn build_control_loop(config: &MathChatConfig, connect: &ConnectArgs) -> Result<ControlLoop, MathChatError> {
    config.validate()?;
    let decision_maker: Arc<dyn DecisionMaker> = Arc::new(OpenAiDecisionMaker::from_config(config)?);
    let executor = build_executor(connect, config).await?;
    Ok(assemble(config, decision_maker, executor))
}

pub fn assemble(
    config: &MathChatConfig,
    decision_maker: Arc<dyn DecisionMaker>,
    executor: Arc<dyn OperationExecutor>,
) -> ControlLoop {
    let control = ControlLoop::new(decision_maker, executor).with_config(config.loop_config());
    match &config.system_prompt {
        Some(prompt) => control.with_system_prompt(prompt.clone()),
        None => control,
    }
}

/// Line-oriented chat: one question per line, each with a fresh history.
///
/// Stops at EOF, `exit` or `quit`. A failed question is reported and the
/// session continues.
pub async fn run_repl<R, W>(control: &ControlLoop, input: R, mut output: W) -> Result<(), MathChatError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        match control.run(query).await {
            Ok(outcome) => {
                output.write_all(outcome.answer.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                output.write_all(format!("Error: {e}\n").as_bytes()).await?;
            }
        }
    }
    output.flush().await?;
    Ok(())
}
