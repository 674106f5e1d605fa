/// Error Types for the Tool Server
///
/// Uses `thiserror` for the error taxonomy. Protocol errors carry their JSON-RPC
/// code; dispatch errors are rejected before a tool runs; tool errors are data
/// that end up inside a successful `tools/call` result.

use std::borrow::Cow;
use thiserror::Error;

/// JSON-RPC 2.0 protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Parse error")]
    ParseError,

    #[error("Invalid Request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("{0}")]
    Internal(String),
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Internal(_) => -32603,
        }
    }
}

/// Failures that stop a `tools/call` before the tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Tool \"{0}\" not found in registry")]
    ToolNotFound(String),

    #[error("Registry entry \"{0}\" is not invocable")]
    InvalidRegistryEntry(String),

    #[error("{0}")]
    InvalidArguments(Cow<'static, str>),
}

impl From<DispatchError> for ProtocolError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidArguments(msg) => ProtocolError::InvalidParams(msg),
            other => ProtocolError::Internal(other.to_string()),
        }
    }
}

/// Error returned by a tool handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

impl From<String> for ToolError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for ToolError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}

/// Configuration errors raised while reading the process environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error("{var} must be a JSON object of string values: {message}")]
    InvalidEnvJson { var: &'static str, message: String },
}
