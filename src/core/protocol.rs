/// JSON-RPC Envelope Codec
///
/// Decodes raw request bodies into typed requests and encodes responses. Every
/// decoding failure carries the correlation id (when one could be read) and a
/// `ProtocolError`, so the caller can always answer with a well-formed envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::error;

use crate::core::environment::EnvMap;
use crate::core::error::ProtocolError;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// Sent when not even the fallback envelope can be serialized.
const ENCODE_FAILURE_BODY: &[u8] = br#"{"jsonrpc":"2.0","protocolVersion":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// Arguments of a `tools/call` request.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CallArguments {
    /// Tool input. Missing or `null` means `{}`.
    #[serde(default, alias = "input")]
    pub inputs: Option<Value>,
    /// Per-call environment overrides.
    #[serde(default)]
    pub env: Option<EnvMap>,
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: CallArguments,
}

/// Supported RPC methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    ToolsList,
    ToolsCall(CallToolParams),
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Correlation id, echoed verbatim. `null` when absent.
    pub id: Value,
    pub method: Method,
}

/// A request rejected during decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcFailure {
    pub id: Value,
    pub error: ProtocolError,
}

impl RpcFailure {
    fn new(id: Value, error: ProtocolError) -> Self {
        Self { id, error }
    }
}

/// Decode a raw request body.
pub fn decode_request(bytes: &[u8]) -> Result<RpcRequest, RpcFailure> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(RpcFailure::new(
            Value::Null,
            ProtocolError::InvalidRequest("empty request body".into()),
        ));
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|_| RpcFailure::new(Value::Null, ProtocolError::ParseError))?;

    let Value::Object(mut request) = value else {
        return Err(RpcFailure::new(
            Value::Null,
            ProtocolError::InvalidRequest("request must be a JSON object".into()),
        ));
    };

    let id = request.remove("id").unwrap_or(Value::Null);

    let version = request
        .get("jsonrpc")
        .or_else(|| request.get("protocolVersion"))
        .and_then(Value::as_str);
    if version != Some(JSONRPC_VERSION) {
        return Err(RpcFailure::new(
            id,
            ProtocolError::InvalidRequest("protocol version must be \"2.0\"".into()),
        ));
    }

    let Some(method) = request
        .get("method")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return Err(RpcFailure::new(
            id,
            ProtocolError::InvalidRequest("method must be a string".into()),
        ));
    };

    let method = match method.as_str() {
        "tools/list" => Method::ToolsList,
        "tools/call" => match parse_call_params(request.remove("params")) {
            Ok(params) => Method::ToolsCall(params),
            Err(err) => return Err(RpcFailure::new(id, err)),
        },
        other => {
            return Err(RpcFailure::new(
                id,
                ProtocolError::MethodNotFound(other.to_string()),
            ));
        }
    };

    Ok(RpcRequest { id, method })
}

fn parse_call_params(params: Option<Value>) -> Result<CallToolParams, ProtocolError> {
    let params: Map<String, Value> = match params {
        Some(Value::Object(params)) => params,
        _ => {
            return Err(ProtocolError::InvalidParams(
                "tools/call params must be an object".into(),
            ));
        }
    };

    let name = match params.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(ProtocolError::InvalidParams(
                "tool name must be a non-empty string".into(),
            ));
        }
    };

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => CallArguments::default(),
        Some(arguments) => serde_json::from_value(arguments.clone()).map_err(|e| {
            ProtocolError::InvalidParams(Cow::Owned(format!("invalid arguments: {}", e)))
        })?,
    };

    Ok(CallToolParams { name, arguments })
}

/// True for an object without an `id`, i.e. a JSON-RPC notification.
pub fn is_notification(bytes: &[u8]) -> bool {
    matches!(
        serde_json::from_slice::<Value>(bytes),
        Ok(Value::Object(request)) if !request.contains_key("id")
    )
}

/// Result of running one tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// MCP `tools/call` result payload.
    pub fn into_call_result(self) -> Value {
        match self {
            Self::Success(value) => serde_json::json!({
                "content": [{ "type": "text", "text": value.to_string() }]
            }),
            Self::Failure(message) => serde_json::json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::json!({ "error": message }).to_string()
                }],
                "isError": true
            }),
        }
    }
}

/// JSON-RPC 2.0 Response.
///
/// Exactly one of `result` and `error` is set. The version is written under
/// both `jsonrpc` and `protocolVersion`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: Cow<'static, str>,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Cow<'static, str>,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            protocol_version: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            protocol_version: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Envelope for requests to an unknown route.
    pub fn not_found() -> Self {
        Self::error(Value::Null, JsonRpcError::new(-32601, "Not Found"))
    }
}

/// JSON-RPC 2.0 Error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&ProtocolError> for JsonRpcError {
    fn from(err: &ProtocolError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// Transport-level disposition of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    BadRequest,
    NotFound,
    PayloadTooLarge,
    InternalError,
}

impl ReplyStatus {
    pub fn for_error(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::ParseError
            | ProtocolError::InvalidRequest(_)
            | ProtocolError::InvalidParams(_) => Self::BadRequest,
            ProtocolError::MethodNotFound(_) => Self::Ok,
            ProtocolError::Internal(_) => Self::InternalError,
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::PayloadTooLarge => 413,
            Self::InternalError => 500,
        }
    }
}

/// A response envelope plus how the transport should deliver it.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcReply {
    pub status: ReplyStatus,
    pub response: JsonRpcResponse,
}

impl RpcReply {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            status: ReplyStatus::Ok,
            response: JsonRpcResponse::success(id, result),
        }
    }

    pub fn failure(id: Value, err: &ProtocolError) -> Self {
        Self {
            status: ReplyStatus::for_error(err),
            response: JsonRpcResponse::error(id, err.into()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: ReplyStatus::NotFound,
            response: JsonRpcResponse::not_found(),
        }
    }

    /// Envelope for a request body over `limit` bytes.
    pub fn payload_too_large(limit: usize) -> Self {
        let err = ProtocolError::InvalidRequest(format!("request body exceeds {limit} bytes").into());
        Self {
            status: ReplyStatus::PayloadTooLarge,
            response: JsonRpcResponse::error(Value::Null, (&err).into()),
        }
    }

    pub fn body(&self) -> Vec<u8> {
        encode_response(&self.response)
    }
}

impl From<RpcFailure> for RpcReply {
    fn from(failure: RpcFailure) -> Self {
        Self::failure(failure.id, &failure.error)
    }
}

/// Serialize a response envelope.
pub fn encode_response(response: &JsonRpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|e| {
        error!("Error serializing response: {}", e);
        encode_failure(&response.id)
    })
}

/// Internal-error envelope for `id`, used when the real response could not
/// be serialized.
fn encode_failure(id: &Value) -> Vec<u8> {
    let fallback = JsonRpcResponse::error(id.clone(), JsonRpcError::new(-32603, "Internal error"));
    serde_json::to_vec(&fallback).unwrap_or_else(|_| ENCODE_FAILURE_BODY.to_vec())
}
