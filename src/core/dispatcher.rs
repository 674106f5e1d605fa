/// Request Dispatcher
///
/// Resolves tool names against the registry, builds each call's invocation
/// context, runs the tool and turns whatever happens into a `ToolOutcome`.
/// `Dispatcher::handle` is the transport-neutral entry point: raw request
/// bytes in, response envelope out.

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::environment::{Environment, InvocationContext, with_overlay};
use crate::core::error::{DispatchError, ProtocolError};
use crate::core::lifecycle::{Lifecycle, LifecycleStatus};
use crate::core::protocol::{CallArguments, Method, RpcReply, ToolOutcome, decode_request};
use crate::core::registry::{ToolHandler, ToolRegistry};

/// Body of the health endpoint.
#[derive(Serialize, Debug, Clone)]
pub struct HealthStatus {
    pub status: &'static str,
    #[serde(flatten)]
    pub lifecycle: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    baseline: Environment,
    lifecycle: Arc<Lifecycle>,
    /// `tools/list` result, computed once.
    tools_list: Value,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, baseline: Environment, lifecycle: Arc<Lifecycle>) -> Self {
        let tools_list = serde_json::json!({ "tools": registry.tools() });
        Self {
            registry,
            baseline,
            lifecycle,
            tools_list,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn baseline(&self) -> &Environment {
        &self.baseline
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    pub fn tools_list(&self) -> &Value {
        &self.tools_list
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "running",
            lifecycle: self.lifecycle.status(),
            runtime: None,
            tools: None,
        }
    }

    /// Run one tool call.
    ///
    /// Resolution failures are returned as errors and are not counted. Once a
    /// handler is resolved the call is counted, and anything the handler does,
    /// including panicking, ends up as a `ToolOutcome`.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: CallArguments,
    ) -> Result<ToolOutcome, DispatchError> {
        if name.is_empty() {
            return Err(DispatchError::InvalidArguments(
                "tool name must be a non-empty string".into(),
            ));
        }

        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| DispatchError::ToolNotFound(name.to_string()))?;
        let handler = entry
            .handler()
            .ok_or_else(|| DispatchError::InvalidRegistryEntry(name.to_string()))?;

        // Counted before invoking so slow tools still use up the budget promptly.
        let count = self.lifecycle.record_request();
        debug!(tool = name, request = count, "Dispatching tool call");

        let CallArguments { inputs, env } = arguments;
        let input = inputs.unwrap_or_else(|| serde_json::json!({}));
        let outcome = with_overlay(&self.baseline, env.unwrap_or_default(), |ctx| {
            invoke(handler, input, ctx)
        })
        .await;

        if let ToolOutcome::Failure(message) = &outcome {
            warn!(tool = name, error = %message, "Tool execution failed");
        }

        if self.lifecycle.should_shutdown() && self.lifecycle.shutdown_signal().trigger() {
            info!(
                requests = self.lifecycle.request_count(),
                "Max requests reached, shutting down"
            );
        }

        Ok(outcome)
    }

    /// Decode, dispatch and build the response for one raw request body.
    pub async fn handle(&self, body: &[u8]) -> RpcReply {
        let request = match decode_request(body) {
            Ok(request) => request,
            Err(failure) => {
                debug!(code = failure.error.code(), "Rejected request: {}", failure.error);
                return failure.into();
            }
        };

        match request.method {
            Method::ToolsList => RpcReply::success(request.id, self.tools_list.clone()),
            Method::ToolsCall(params) => match self.dispatch(&params.name, params.arguments).await {
                Ok(outcome) => RpcReply::success(request.id, outcome.into_call_result()),
                Err(err) => {
                    warn!(tool = %params.name, "Tool call rejected: {}", err);
                    RpcReply::failure(request.id, &ProtocolError::from(err))
                }
            },
        }
    }
}

async fn invoke(handler: &ToolHandler, input: Value, ctx: InvocationContext) -> ToolOutcome {
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(input, ctx))) {
        Ok(future) => future,
        Err(panic) => return ToolOutcome::Failure(panic_message(panic.as_ref())),
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => ToolOutcome::Success(value),
        Ok(Err(err)) => ToolOutcome::Failure(err.to_string()),
        Err(panic) => ToolOutcome::Failure(panic_message(panic.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("Tool panicked: {}", detail),
        None => "Tool panicked".to_string(),
    }
}
