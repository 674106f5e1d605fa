/// Server Configuration
///
/// All settings come from environment variables and are read once at startup.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "mcp-tool-server")
/// - SERVER_VERSION: Version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "http", "stdio" or "serverless" (default: "http")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 3000)
/// - WORKER_THREADS: HTTP worker count (default: CPU count, max 16)
/// - MCP_MAX_BODY_BYTES: Largest accepted HTTP request body (default: 16 MiB)
/// - MCP_MAX_REQUESTS: Tool calls to serve before shutting down (default: unlimited)
/// - MCP_TTL_EXTEND: Advisory idle TTL in seconds (default: 3600)
/// - MCP_SHUTDOWN_GRACE_MS: Delay before stopping once the budget is used (default: 1000)
/// - MCP_ENV_JSON: Baked-in environment overlay, a JSON object
/// - MCP_ENV: Runtime environment overlay, a JSON object; wins over MCP_ENV_JSON

use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::core::environment::EnvMap;
use crate::core::error::ConfigError;
use crate::core::lifecycle::{DEFAULT_SHUTDOWN_GRACE, DEFAULT_TTL_EXTEND_SECONDS, LifecycleConfig};

const DEFAULT_NAME: &str = "mcp-tool-server";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const MAX_DEFAULT_WORKERS: usize = 16;
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Which transport shell the binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Http,
    Stdio,
    Serverless,
}

impl FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stdio" => Ok(Self::Stdio),
            "serverless" | "lambda" => Ok(Self::Serverless),
            other => Err(ConfigError::InvalidValue {
                field: "MCP_TRANSPORT_MODE",
                message: format!("'{}' must be 'http', 'stdio' or 'serverless'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    /// `None` picks a count from the CPU count.
    pub workers: Option<usize>,
    /// Request bodies above this size get a 413 envelope.
    pub max_body_bytes: usize,
    pub lifecycle: LifecycleConfig,
    /// Baked-in overlay merged with the runtime overlay.
    pub env_overlay: EnvMap,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            transport: TransportMode::Http,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            lifecycle: LifecycleConfig::default(),
            env_overlay: EnvMap::new(),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let transport = match get("MCP_TRANSPORT_MODE") {
            Some(mode) => mode.trim().parse()?,
            None => defaults.transport,
        };

        let mut env_overlay = parse_env_json("MCP_ENV_JSON", get("MCP_ENV_JSON"))?;
        env_overlay.extend(parse_env_json("MCP_ENV", get("MCP_ENV"))?);

        Ok(Self {
            name: get("SERVER_NAME").unwrap_or(defaults.name),
            version: get("SERVER_VERSION").unwrap_or(defaults.version),
            transport,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_number("PORT", get("PORT"))?.unwrap_or(defaults.port),
            workers: parse_number("WORKER_THREADS", get("WORKER_THREADS"))?,
            max_body_bytes: parse_number("MCP_MAX_BODY_BYTES", get("MCP_MAX_BODY_BYTES"))?
                .unwrap_or(defaults.max_body_bytes),
            lifecycle: LifecycleConfig {
                max_requests: parse_number("MCP_MAX_REQUESTS", get("MCP_MAX_REQUESTS"))?,
                ttl_extend_seconds: parse_number("MCP_TTL_EXTEND", get("MCP_TTL_EXTEND"))?
                    .unwrap_or(DEFAULT_TTL_EXTEND_SECONDS),
                shutdown_grace: parse_number("MCP_SHUTDOWN_GRACE_MS", get("MCP_SHUTDOWN_GRACE_MS"))?
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_SHUTDOWN_GRACE),
            },
            env_overlay,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Worker threads for the HTTP server.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS))
            .max(1)
    }
}

fn parse_number<T>(field: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.map(|raw| {
        raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
            field,
            message: format!("'{}': {}", raw, e),
        })
    })
    .transpose()
}

/// Parse a JSON object overlay. Non-string scalars are stringified and `null`
/// entries are dropped.
fn parse_env_json(var: &'static str, raw: Option<String>) -> Result<EnvMap, ConfigError> {
    let Some(raw) = raw else {
        return Ok(EnvMap::new());
    };

    let value: Value = serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidEnvJson {
        var,
        message: e.to_string(),
    })?;
    let Value::Object(entries) = value else {
        return Err(ConfigError::InvalidEnvJson {
            var,
            message: "expected an object".to_string(),
        });
    };

    let mut env = EnvMap::new();
    for (key, value) in entries {
        match value {
            Value::Null => {}
            Value::String(s) => {
                env.insert(key, s);
            }
            Value::Number(_) | Value::Bool(_) => {
                env.insert(key, value.to_string());
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(ConfigError::InvalidEnvJson {
                    var,
                    message: format!("value for '{}' must be a scalar", key),
                });
            }
        }
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.lifecycle.max_requests, None);
        assert_eq!(config.lifecycle.ttl_extend_seconds, 3600);
        assert!(config.worker_count() >= 1 && config.worker_count() <= 16);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("MCP_TRANSPORT_MODE", "Serverless"),
            ("PORT", "8080"),
            ("WORKER_THREADS", "2"),
            ("MCP_MAX_REQUESTS", "50"),
            ("MCP_TTL_EXTEND", "60"),
            ("MCP_SHUTDOWN_GRACE_MS", "250"),
            ("MCP_MAX_BODY_BYTES", "4096"),
            ("SERVER_NAME", "tools"),
        ])
        .unwrap();
        assert_eq!(config.max_body_bytes, 4096);

        assert_eq!(config.transport, TransportMode::Serverless);
        assert_eq!(config.port, 8080);
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.lifecycle.max_requests, Some(50));
        assert_eq!(config.lifecycle.ttl_extend_seconds, 60);
        assert_eq!(config.lifecycle.shutdown_grace, Duration::from_millis(250));
        assert_eq!(config.name, "tools");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = config(&[("MCP_MAX_REQUESTS", ""), ("PORT", " ")]).unwrap();
        assert_eq!(config.lifecycle.max_requests, None);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidValue { field: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("MCP_MAX_REQUESTS", "-1")]),
            Err(ConfigError::InvalidValue { field: "MCP_MAX_REQUESTS", .. })
        ));
        assert!(config(&[("MCP_TRANSPORT_MODE", "carrier-pigeon")]).is_err());
        assert!(matches!(
            config(&[("MCP_ENV", "[1]")]),
            Err(ConfigError::InvalidEnvJson { var: "MCP_ENV", .. })
        ));
    }

    #[test]
    fn test_runtime_env_wins_over_baked() {
        let config = config(&[
            ("MCP_ENV_JSON", r#"{"SKEDYUL_ENV": "baked", "REGION": "eu", "RETRIES": 3, "GONE": null}"#),
            ("MCP_ENV", r#"{"SKEDYUL_ENV": "runtime"}"#),
        ])
        .unwrap();

        assert_eq!(config.env_overlay.get("SKEDYUL_ENV").map(String::as_str), Some("runtime"));
        assert_eq!(config.env_overlay.get("REGION").map(String::as_str), Some("eu"));
        assert_eq!(config.env_overlay.get("RETRIES").map(String::as_str), Some("3"));
        assert!(!config.env_overlay.contains_key("GONE"));
    }
}
