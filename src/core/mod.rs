/// Core Server Framework Module
///
/// - config.rs: configuration from environment variables
/// - environment.rs: per-call environment overlays
/// - lifecycle.rs: request counting and shutdown signalling
/// - registry.rs: tool registry and descriptors
/// - protocol.rs: JSON-RPC envelope codec
/// - dispatcher.rs: tool dispatch and the request pipeline
/// - server.rs: HTTP and STDIO transports
/// - serverless.rs: single-invocation event adapter

pub mod config;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod serverless;
