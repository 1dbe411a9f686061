//! mathchat binary entry point.

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use mathchat::cli::session::{apply_session_args, build_control_loop, build_executor, run_repl};
use mathchat::cli::{AskArgs, Cli, Commands, ConnectArgs, ServeArgs, SessionArgs};
use mathchat::config::MathChatConfig;
use mathchat::error::MathChatError;
use mathchat::executor::OperationExecutor;
use mathchat::mcp::server::http;
use mathchat::mcp::MathServer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Logs go to stderr so `serve --stdio` keeps stdout for the protocol.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => handle_serve(args).await,
        Commands::Ask(args) => handle_ask(cli.config.as_deref(), args).await,
        Commands::Chat(args) => handle_chat(cli.config.as_deref(), args).await,
        Commands::Tools(args) => handle_tools(cli.config.as_deref(), args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_serve(args: ServeArgs) -> Result<(), MathChatError> {
    let server = MathServer::builtin();
    if args.stdio {
        return server.serve_stdio().await;
    }

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            on_signal.cancel();
        }
    });

    http::serve(server, args.bind, shutdown, |addr| {
        eprintln!("Math MCP server listening on http://{addr}{}", http::MCP_PATH);
    })
    .await
}

fn load_config(
    path: Option<&std::path::Path>,
    args: &SessionArgs,
) -> Result<MathChatConfig, MathChatError> {
    Ok(apply_session_args(MathChatConfig::load(path)?, args))
}

async fn handle_ask(path: Option<&std::path::Path>, args: AskArgs) -> Result<(), MathChatError> {
    let config = load_config(path, &args.session)?;
    let control = build_control_loop(&config, &args.session.connect).await?;
    let outcome = control.run(&args.query).await?;
    println!("{}", outcome.answer);
    Ok(())
}

async fn handle_chat(path: Option<&std::path::Path>, args: SessionArgs) -> Result<(), MathChatError> {
    let config = load_config(path, &args)?;
    let control = build_control_loop(&config, &args.connect).await?;
    eprintln!(
        "mathchat: {} operations available; type 'exit' to quit",
        control.catalog().len()
    );
    run_repl(&control, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

async fn handle_tools(path: Option<&std::path::Path>, args: ConnectArgs) -> Result<(), MathChatError> {
    let mut config = MathChatConfig::load(path)?;
    if let Some(url) = &args.server_url {
        config.mcp_url = url.clone();
    }
    let executor = build_executor(&args, &config).await?;
    for spec in executor.catalog() {
        println!("{:<12} {}", spec.name, spec.description);
    }
    Ok(())
}
