/// Tool Registry
///
/// The registry maps tool names to handlers and keeps the descriptor list that
/// `tools/list` reports. It is filled during startup, then wrapped in an `Arc`
/// and never changed again.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::environment::InvocationContext;
use crate::core::error::ToolError;

/// MCP tool definition structure.
///
/// Serialized as one entry of the `tools/list` result.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Unique tool identifier (e.g. "hello-world")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the call arguments
    pub input_schema: Value,
}

impl McpTool {
    /// Descriptor derived from the tool name alone.
    pub fn for_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Function: {}", name),
            name,
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "inputs": {
                        "type": "object",
                        "description": "Input parameters for the function"
                    }
                },
                "required": ["inputs"]
            }),
        }
    }
}

/// Tool handler function type definition.
///
/// Handlers take the call's `inputs` and its invocation context and resolve to
/// either a JSON result or a `ToolError`. Synchronous tools can be registered
/// with `ToolRegistry::register_sync`.
pub type ToolHandler =
    Arc<dyn Fn(Value, InvocationContext) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// Wrap an async function as a `ToolHandler`.
pub fn tool_handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(move |input: Value, ctx: InvocationContext| f(input, ctx).boxed())
}

/// A registry slot. Declared-only entries are listed but cannot be invoked.
#[derive(Clone)]
pub enum RegistryEntry {
    Handler(ToolHandler),
    Declared,
}

impl RegistryEntry {
    pub fn handler(&self) -> Option<&ToolHandler> {
        match self {
            Self::Handler(handler) => Some(handler),
            Self::Declared => None,
        }
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler(..)"),
            Self::Declared => f.write_str("Declared"),
        }
    }
}

/// Registry of available MCP tools.
///
/// `tools` keeps registration order for `tools/list`; `entries` is the lookup
/// table used by `tools/call`.
#[derive(Default, Debug)]
pub struct ToolRegistry {
    tools: Vec<McpTool>,
    entries: HashMap<String, RegistryEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name` with the default descriptor.
    pub fn register(&mut self, name: &str, handler: ToolHandler) {
        self.insert(McpTool::for_name(name), RegistryEntry::Handler(handler));
    }

    /// Register a handler with a custom descriptor.
    pub fn register_tool(&mut self, tool: McpTool, handler: ToolHandler) {
        self.insert(tool, RegistryEntry::Handler(handler));
    }

    /// Register a plain synchronous function.
    pub fn register_sync<F>(&mut self, name: &str, f: F)
    where
        F: Fn(Value, &InvocationContext) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.register(
            name,
            tool_handler(move |input, ctx| {
                let f = Arc::clone(&f);
                async move { f(input, &ctx) }
            }),
        );
    }

    /// List a tool without making it callable.
    pub fn declare(&mut self, tool: McpTool) {
        self.insert(tool, RegistryEntry::Declared);
    }

    fn insert(&mut self, tool: McpTool, entry: RegistryEntry) {
        debug!("Registering tool: {}", tool.name);
        match self.tools.iter_mut().find(|t| t.name == tool.name) {
            Some(existing) => *existing = tool.clone(),
            None => self.tools.push(tool.clone()),
        }
        self.entries.insert(tool.name, entry);
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Descriptors in registration order.
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::EnvMap;

    fn constant(value: Value) -> ToolHandler {
        tool_handler(move |_input, _ctx| {
            let value = value.clone();
            async move { Ok::<_, ToolError>(value) }
        })
    }

    #[test]
    fn test_registration_order_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register("b", constant(Value::Null));
        registry.register("a", constant(Value::Null));
        registry.declare(McpTool::for_name("c"));

        assert_eq!(registry.names(), vec!["b", "a", "c"]);
        assert!(registry.get("a").and_then(RegistryEntry::handler).is_some());
        assert!(registry.get("c").and_then(RegistryEntry::handler).is_none());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register("a", constant(Value::Null));
        registry.register("b", constant(Value::Null));
        registry.register_tool(
            McpTool {
                name: "a".into(),
                description: "Replaced".into(),
                input_schema: serde_json::json!({"type": "object"}),
            },
            constant(Value::Null),
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.tools()[0].description, "Replaced");
    }

    #[test]
    fn test_default_descriptor_shape() {
        let json = serde_json::to_value(McpTool::for_name("hello-world")).unwrap();
        assert_eq!(json["name"], "hello-world");
        assert_eq!(json["description"], "Function: hello-world");
        assert_eq!(json["inputSchema"]["required"][0], "inputs");
    }

    #[tokio::test]
    async fn test_register_sync_runs_closure() {
        let mut registry = ToolRegistry::new();
        registry.register_sync("env", |_input, ctx| {
            Ok(serde_json::json!({ "stage": ctx.env("STAGE") }))
        });

        let handler = registry.get("env").and_then(RegistryEntry::handler).unwrap();
        let mut env = EnvMap::new();
        env.insert("STAGE".into(), "prod".into());
        let result = handler(Value::Null, InvocationContext::from_env(env))
            .await
            .unwrap();

        assert_eq!(result["stage"], "prod");
    }
}
