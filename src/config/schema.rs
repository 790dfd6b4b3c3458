//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway
//! node. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Node identity.
    pub node: NodeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Built-in service toggles.
    pub services: ServicesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Human-readable node name.
    pub name: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "gateway".to_string(),
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in milliseconds; zero means infinite.
    pub request_ms: u64,

    /// Minimum remaining window granted to a request in milliseconds.
    pub request_grace_ms: u64,

    /// How long a stopping reactor waits for in-flight requests, in
    /// milliseconds.
    pub pending_requests_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 0,
            request_grace_ms: 30,
            pending_requests_ms: 10_000,
        }
    }
}

/// Built-in service toggles.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServicesConfig {
    /// Install tracing hooks around processor chains and the invoker.
    pub tracing_enabled: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level fallback when RUST_LOG is unset.
    pub log_level: String,

    /// Enable the metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
