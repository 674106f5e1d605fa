use mcp_tool_server::core::serverless::{ApiGatewayEvent, ApiGatewayResponse, handle_event};
use mcp_tool_server::{Dispatcher, EnvMap, Environment, Lifecycle, tools};
use serde_json::{Value, json};
use std::sync::Arc;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(
        Arc::new(tools::registry()),
        Environment::from_map(EnvMap::new()),
        Arc::new(Lifecycle::default()),
    )
}

fn event(method: &str, path: &str, body: Option<String>) -> ApiGatewayEvent {
    serde_json::from_value(json!({
        "httpMethod": method,
        "path": path,
        "headers": {"Content-Type": "application/json"},
        "body": body,
        "queryStringParameters": null,
        "requestContext": {"requestId": "test-request-id"}
    }))
    .unwrap()
}

fn body(response: &ApiGatewayResponse) -> Value {
    serde_json::from_str(&response.body).unwrap()
}

#[tokio::test]
async fn health_includes_runtime_and_tools() {
    let dispatcher = dispatcher();
    let response = handle_event(&dispatcher, &event("GET", "/health", None)).await;

    assert_eq!(response.status_code, 200);
    assert!(response.headers["Content-Type"].contains("application/json"));
    let body = body(&response);
    assert_eq!(body["status"], "running");
    assert_eq!(body["runtime"], "lambda");
    assert_eq!(body["tools"], json!(["hello-world", "echo"]));
    assert_eq!(body["requests"], 0);
}

#[tokio::test]
async fn cors_preflight() {
    let response = handle_event(&dispatcher(), &event("OPTIONS", "/mcp", None)).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    assert!(response.headers.contains_key("Access-Control-Allow-Methods"));
}

#[tokio::test]
async fn tools_call_with_env_overlay() {
    let dispatcher = dispatcher();
    let request = json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": {
            "name": "hello-world",
            "arguments": {"inputs": {"name": "EnvTest"}, "env": {"SKEDYUL_ENV": "custom-environment"}}
        }
    });
    let response = handle_event(&dispatcher, &event("POST", "/mcp", Some(request.to_string()))).await;

    assert_eq!(response.status_code, 200);
    let body = body(&response);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 3);
    let result: Value =
        serde_json::from_str(body["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(result["environmentName"], "custom-environment");
    assert!(result["message"].as_str().unwrap().contains("EnvTest"));
    assert_eq!(dispatcher.baseline().get("SKEDYUL_ENV"), None);
    assert_eq!(dispatcher.lifecycle().request_count(), 1);
}

#[tokio::test]
async fn error_statuses() {
    let dispatcher = dispatcher();

    let response =
        handle_event(&dispatcher, &event("POST", "/mcp", Some("{invalid json}".to_string()))).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["error"]["code"], -32700);

    let request = json!({"jsonrpc": "1.0", "id": 4, "method": "tools/list"});
    let response = handle_event(&dispatcher, &event("POST", "/mcp", Some(request.to_string()))).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(body(&response)["error"]["code"], -32600);

    let request = json!({"jsonrpc": "2.0", "id": 6, "method": "unknown/method", "params": {}});
    let response = handle_event(&dispatcher, &event("POST", "/mcp", Some(request.to_string()))).await;
    assert_eq!(response.status_code, 200);
    assert_eq!(body(&response)["error"]["code"], -32601);

    let response = handle_event(&dispatcher, &event("GET", "/invalid", None)).await;
    assert_eq!(response.status_code, 404);
}
