/// Echo Tool Implementation
///
/// Takes a message parameter and returns it, optionally with a prefix read
/// from the `ECHO_PREFIX` environment variable of the call.

use crate::core::environment::InvocationContext;
use crate::core::error::ToolError;
use crate::core::registry::{McpTool, ToolRegistry, tool_handler};
use serde_json::Value;

pub const NAME: &str = "echo";

/// Environment variable holding the optional prefix.
pub const PREFIX_VAR: &str = "ECHO_PREFIX";

/// Register the echo tool with the tool registry.
pub fn register(registry: &mut ToolRegistry) {
    let tool = McpTool {
        name: NAME.to_string(),
        description: "Echo a message back to the client.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "inputs": {
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The message to echo"
                        }
                    },
                    "required": ["message"]
                }
            },
            "required": ["inputs"]
        }),
    };

    registry.register_tool(tool, tool_handler(|input, ctx| async move { echo(&input, &ctx) }));
}

pub fn echo(input: &Value, ctx: &InvocationContext) -> Result<Value, ToolError> {
    // Extract and validate the required "message" parameter
    let message = input
        .get("message")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidInput("Missing required parameter: message".to_string()))?;

    let prefix = ctx.env(PREFIX_VAR).unwrap_or("");
    let result = if prefix.is_empty() {
        message.to_string()
    } else {
        // Pre-allocate with known capacity for efficiency
        let mut result = String::with_capacity(prefix.len() + message.len());
        result.push_str(prefix);
        result.push_str(message);
        result
    };

    Ok(serde_json::json!({ "result": result }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::EnvMap;
    use serde_json::json;

    #[test]
    fn test_echo_with_prefix() {
        let mut env = EnvMap::new();
        env.insert(PREFIX_VAR.to_string(), "Echo: ".to_string());
        let ctx = InvocationContext::from_env(env);

        let result = echo(&json!({"message": "ping"}), &ctx).unwrap();
        assert_eq!(result, json!({"result": "Echo: ping"}));
    }

    #[test]
    fn test_echo_requires_message() {
        let ctx = InvocationContext::from_env(EnvMap::new());
        assert_eq!(echo(&json!({"message": "ping"}), &ctx).unwrap()["result"], "ping");
        assert!(echo(&json!({}), &ctx).is_err());
    }
}
