//! Endpoint groups: where backend traffic goes.

use serde::{Deserialize, Serialize};

use crate::definition::default_true;
use crate::definition::service::{Service, ServiceDiscovery};

/// Load-balancing strategy for a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerType {
    #[default]
    RoundRobin,
    Random,
}

/// A backend endpoint (v4 style: typed connector + configuration).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointDefinition {
    pub name: String,
    /// Endpoint connector type, e.g. `http-proxy`, `mock`.
    #[serde(rename = "type")]
    pub endpoint_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}

fn default_weight() -> u32 {
    1
}

/// A named group of endpoints sharing a load-balancing strategy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointGroupDefinition {
    pub name: String,
    #[serde(default)]
    pub load_balancer: LoadBalancerType,
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,
    /// Group-attached services (health check, ...).
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Legacy proxy section: v2-style endpoint groups with per-endpoint
/// connector types and optional service discovery.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyDefinition {
    #[serde(default)]
    pub groups: Vec<ProxyGroup>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<ProxyEndpoint>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub discovery: Option<ServiceDiscovery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyEndpoint {
    pub name: String,
    /// Connector type for this endpoint, e.g. `http`, `grpc`.
    #[serde(rename = "type")]
    pub endpoint_type: String,
    pub target: String,
}
