/// Serverless Adapter
///
/// Serves one API-Gateway-style proxy event per invocation. Routes match the
/// HTTP server: `GET /health`, `POST /mcp`, plus CORS preflight. Every response
/// carries JSON and CORS headers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::core::dispatcher::Dispatcher;
use crate::core::protocol::{ReplyStatus, RpcReply};

/// Reported as `runtime` by the serverless health route.
pub const RUNTIME_NAME: &str = "lambda";

/// Incoming proxy event.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Proxy response returned to the gateway.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiGatewayResponse {
    fn json(status_code: u16, body: String) -> Self {
        let headers = [
            ("Content-Type", "application/json"),
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
            ("Access-Control-Allow-Headers", "Content-Type"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            status_code,
            headers,
            body,
        }
    }

    fn from_reply(reply: &RpcReply) -> Self {
        Self::json(
            reply.status.http_status(),
            String::from_utf8_lossy(&reply.body()).into_owned(),
        )
    }
}

/// Handle a single proxy event.
pub async fn handle_event(dispatcher: &Dispatcher, event: &ApiGatewayEvent) -> ApiGatewayResponse {
    let request_id = event
        .request_context
        .as_ref()
        .and_then(|c| c.request_id.as_deref())
        .unwrap_or("-");
    debug!(request_id, method = %event.http_method, path = %event.path, "Serverless event");

    match (event.http_method.as_str(), event.path.as_str()) {
        ("OPTIONS", _) => ApiGatewayResponse::json(
            ReplyStatus::Ok.http_status(),
            serde_json::json!({ "message": "OK" }).to_string(),
        ),
        ("GET", "/health") => {
            let mut health = dispatcher.health();
            health.runtime = Some(RUNTIME_NAME);
            health.tools = Some(dispatcher.registry().names());
            let body = serde_json::to_string(&health).unwrap_or_else(|_| "{}".to_string());
            ApiGatewayResponse::json(ReplyStatus::Ok.http_status(), body)
        }
        ("POST", "/mcp") => {
            let body = event.body.as_deref().unwrap_or("");
            let reply = dispatcher.handle(body.as_bytes()).await;
            ApiGatewayResponse::from_reply(&reply)
        }
        _ => ApiGatewayResponse::from_reply(&RpcReply::not_found()),
    }
}

/// Read one event from stdin, handle it and write the response to stdout.
pub async fn run_serverless(dispatcher: &Dispatcher) -> std::io::Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut raw = Vec::new();
    tokio::io::stdin().read_to_end(&mut raw).await?;

    let response = match serde_json::from_slice::<ApiGatewayEvent>(&raw) {
        Ok(event) => handle_event(dispatcher, &event).await,
        Err(e) => {
            info!("Rejected malformed serverless event: {}", e);
            ApiGatewayResponse::json(
                ReplyStatus::BadRequest.http_status(),
                serde_json::json!({ "message": format!("Invalid event: {}", e) }).to_string(),
            )
        }
    };

    let mut out = serde_json::to_vec(&response)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await
}
