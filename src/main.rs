/// MCP Server Entry Point
///
/// Reads the configuration from environment variables (see `core::config`),
/// builds the dispatcher and runs the selected transport:
/// - http: long-lived Actix Web server exposing `/health` and `/mcp`
/// - stdio: line-delimited JSON-RPC on stdin/stdout
/// - serverless: handle one proxy event from stdin and exit

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use mcp_tool_server::core::{server, serverless};
use mcp_tool_server::{ServerConfig, TransportMode, build_dispatcher};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Arc::new(build_dispatcher(&config));

    let result = match config.transport {
        TransportMode::Http => server::run_server_http(&config, Arc::clone(&dispatcher)).await,
        TransportMode::Stdio => server::run_server_stdio(&config, Arc::clone(&dispatcher)).await,
        TransportMode::Serverless => serverless::run_serverless(&dispatcher).await,
    };

    match result {
        Ok(()) => {
            info!(
                requests = dispatcher.lifecycle().request_count(),
                "Server shutdown complete"
            );
            // A pending stdin read would otherwise keep the runtime alive.
            std::process::exit(0)
        }
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_tool_server=info,actix_web=info,warn"));

    // stdout belongs to the stdio and serverless protocol streams
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
