//! MCP tool server.
//!
//! Exposes a fixed set of tools over JSON-RPC (`tools/list`, `tools/call`),
//! fronted by an Actix Web HTTP server, a STDIO loop, or a single-invocation
//! serverless adapter. Each call gets its own environment overlay and the
//! server can retire itself after a configured number of calls.

pub mod core;
pub mod tools;

pub use crate::core::config::{ServerConfig, TransportMode};
pub use crate::core::dispatcher::Dispatcher;
pub use crate::core::environment::{EnvMap, Environment, InvocationContext};
pub use crate::core::lifecycle::{Lifecycle, LifecycleConfig};
pub use crate::core::protocol::ToolOutcome;
pub use crate::core::registry::{McpTool, ToolHandler, ToolRegistry};

use std::sync::Arc;

/// Wire up a dispatcher for `config` with the static tool registry.
///
/// The baseline environment is the process environment with the configured
/// overlays merged on top.
pub fn build_dispatcher(config: &ServerConfig) -> Dispatcher {
    let baseline = Environment::from_process().layered(&config.env_overlay);
    Dispatcher::new(
        Arc::new(tools::registry()),
        baseline,
        Arc::new(Lifecycle::new(config.lifecycle.clone())),
    )
}
