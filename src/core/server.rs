/// MCP Server Transports
///
/// This module contains the long-lived transport shells:
/// - HTTP server setup with Actix Web (`/health` and `/mcp`)
/// - STDIO server for line-delimited JSON-RPC
///
/// Both hand raw request bodies to the `Dispatcher` and stop themselves once
/// the lifecycle shutdown signal fires.

use actix_web::{
    App, HttpResponse, HttpServer,
    http::StatusCode,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use bytes::BytesMut;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::config::ServerConfig;
use crate::core::dispatcher::Dispatcher;
use crate::core::error::ProtocolError;
use crate::core::protocol::{self, RpcReply};

/// Application state shared across all worker threads in HTTP mode.
#[derive(Clone)]
pub struct AppState {
    /// Server name as reported in startup logs
    pub server_name: String,
    /// Server version string
    pub server_version: String,
    /// Largest request body accepted on `/mcp`
    pub max_body_bytes: usize,
    pub dispatcher: Arc<Dispatcher>,
}

/// Health check endpoint handler.
///
/// Reports the lifecycle counters so a supervisor can see how much of the
/// request budget is left.
async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dispatcher.health())
}

/// MCP JSON-RPC request handler.
///
/// The body is read from the raw payload so malformed JSON and oversized
/// bodies still get a JSON-RPC envelope instead of an extractor rejection.
async fn mcp_handler(state: web::Data<AppState>, payload: web::Payload) -> HttpResponse {
    let reply = match read_body(payload, state.max_body_bytes).await {
        Ok(body) => state.dispatcher.handle(&body).await,
        Err(reply) => reply,
    };
    reply_to_http(&reply)
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<BytesMut, RpcReply> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            warn!("Error reading request body: {}", e);
            RpcReply::failure(
                serde_json::Value::Null,
                &ProtocolError::InvalidRequest("unreadable request body".into()),
            )
        })?;
        if body.len() + chunk.len() > limit {
            warn!(limit, "Request body too large");
            return Err(RpcReply::payload_too_large(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Fallback for every route that is not served.
async fn not_found() -> HttpResponse {
    reply_to_http(&RpcReply::not_found())
}

fn reply_to_http(reply: &RpcReply) -> HttpResponse {
    let status = StatusCode::from_u16(reply.status.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status)
        .content_type("application/json")
        .body(reply.body())
}

/// Register the HTTP routes.
///
/// Expects a `web::Data<AppState>` to be registered on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health))
        .default_service(web::to(not_found));
}

/// Run the MCP server in HTTP mode.
///
/// # Configuration
/// The server is configured with:
/// - Worker threads: from config, or CPU count (max 16)
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive: 30 seconds
/// - Request timeout: 30 seconds
/// - Disconnect timeout: 2 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let workers = config.worker_count();

    let app_state = web::Data::new(AppState {
        server_name: config.name.clone(),
        server_version: config.version.clone(),
        max_body_bytes: config.max_body_bytes,
        dispatcher: Arc::clone(&dispatcher),
    });

    info!(
        name = %config.name,
        version = %config.version,
        bind = %bind_addr,
        workers,
        max_requests = ?config.lifecycle.max_requests,
        "MCP Server starting (HTTP mode)"
    );
    info!(
        "Registry loaded with {} tools: {}",
        dispatcher.registry().len(),
        dispatcher.registry().names().join(", ")
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            // Enable compression for JSON responses (gzip/brotli)
            .wrap(Compress::default())
            // Add security headers to all responses
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            // %r = request line, %s = status, %Dms = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure)
    })
    .workers(workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run();

    // Stop gracefully once the request budget is used up. The grace delay
    // lets the triggering response and other in-flight calls finish.
    let handle = server.handle();
    let lifecycle = Arc::clone(dispatcher.lifecycle());
    let watcher = tokio::spawn(async move {
        lifecycle.shutdown_signal().wait().await;
        info!(requests = lifecycle.request_count(), "Stopping HTTP server");
        handle.stop(true).await;
    });

    let result = server.await;
    watcher.abort();
    result
}

/// Run the MCP server in STDIO mode.
///
/// Reads JSON-RPC requests line-by-line from stdin and writes responses to
/// stdout. Logging goes to stderr so it never mixes with the protocol stream.
///
/// # Implementation Details
/// - Uses buffered I/O with 8KB buffers
/// - Processes requests one at a time
pub async fn run_server_stdio(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    use tokio::io::{BufReader, BufWriter};

    info!(
        name = %config.name,
        version = %config.version,
        tools = dispatcher.registry().len(),
        "MCP Server starting (STDIO mode)"
    );

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve_lines(&dispatcher, stdin, stdout).await
}

/// Serve line-delimited JSON-RPC from `reader` to `writer`.
///
/// Returns at end of input, or once the shutdown signal fires after the
/// reply that used up the request budget has been written. Notifications
/// (requests without an id) are dispatched like any other request but get
/// no reply line.
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    let mut lines = reader.lines();
    let signal = dispatcher.lifecycle().shutdown_signal();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal.wait() => {
                info!("Max requests reached, stopping STDIO server");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        let notification = protocol::is_notification(line.as_bytes());
        let reply = dispatcher.handle(line.as_bytes()).await;
        if notification {
            continue;
        }

        if let Err(e) = write_line(&mut writer, &reply.body()).await {
            error!("Error writing to stdout: {}", e);
            break;
        }
    }

    if let Err(e) = writer.flush().await {
        warn!("Error flushing stdout: {}", e);
    }
    Ok(())
}

async fn write_line<W>(out: &mut W, body: &[u8]) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    use tokio::io::AsyncWriteExt;

    out.write_all(body).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
