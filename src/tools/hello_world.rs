/// Hello World Tool Implementation
///
/// Example tool showing how a tool reads its inputs and the per-call
/// environment. It greets an optional `name` and reports the environment it
/// runs in from `SKEDYUL_ENV`.

use serde_json::Value;

use crate::core::environment::InvocationContext;
use crate::core::error::ToolError;
use crate::core::registry::{ToolRegistry, tool_handler};

pub const NAME: &str = "hello-world";

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "SKEDYUL_ENV";

/// Register the hello-world tool with the tool registry.
pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        NAME,
        tool_handler(|input, ctx| async move { hello_world(&input, &ctx) }),
    );
}

/// Build the greeting for `input`.
///
/// A missing or blank `name` falls back to "world"; a missing `SKEDYUL_ENV`
/// reports "local".
pub fn hello_world(input: &Value, ctx: &InvocationContext) -> Result<Value, ToolError> {
    let name = match input.get("name") {
        None | Some(Value::Null) => "",
        Some(Value::String(name)) => name.trim(),
        Some(_) => return Err(ToolError::InvalidInput("name must be a string".to_string())),
    };
    let name = if name.is_empty() { "world" } else { name };
    let environment_name = ctx.env(ENVIRONMENT_VAR).unwrap_or("local");

    Ok(serde_json::json!({
        "message": format!("Hello, {}! This response is coming from the MCP tool server.", name),
        "environmentName": environment_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::EnvMap;
    use serde_json::json;

    fn ctx(pairs: &[(&str, &str)]) -> InvocationContext {
        InvocationContext::from_env(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<EnvMap>(),
        )
    }

    #[test]
    fn test_uses_name_and_environment() {
        let result = hello_world(&json!({"name": "Tester"}), &ctx(&[("SKEDYUL_ENV", "TEST")])).unwrap();
        assert_eq!(result["environmentName"], "TEST");
        assert!(result["message"].as_str().unwrap().contains("Tester"));
    }

    #[test]
    fn test_defaults_to_world_when_name_is_blank() {
        let result = hello_world(&json!({"name": "   "}), &ctx(&[])).unwrap();
        assert!(result["message"].as_str().unwrap().contains("Hello, world!"));

        let result = hello_world(&json!({}), &ctx(&[])).unwrap();
        assert!(result["message"].as_str().unwrap().contains("world"));
    }

    #[test]
    fn test_defaults_to_local_environment() {
        let result = hello_world(&json!({"name": "Tester"}), &ctx(&[])).unwrap();
        assert_eq!(result["environmentName"], "local");
    }

    #[test]
    fn test_rejects_non_string_name() {
        let err = hello_world(&json!({"name": 42}), &ctx(&[])).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
