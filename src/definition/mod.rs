//! Deployed API definition model.
//!
//! All types here are immutable after deploy: a redeploy replaces the whole
//! definition snapshot, it never mutates one in place. Everything derives
//! Serde traits for deserialization from definition files.

pub mod endpoint;
pub mod flow;
pub mod listener;
pub mod plan;
pub mod service;

use serde::{Deserialize, Serialize};

pub use endpoint::{EndpointDefinition, EndpointGroupDefinition, LoadBalancerType, ProxyDefinition, ProxyEndpoint, ProxyGroup};
pub use flow::{Flow, FlowLeg, Step};
pub use listener::{EntrypointDefinition, Listener, ListenerType};
pub use plan::{Plan, PlanSecurityType};
pub use service::{Service, ServiceDiscovery};

/// Kind of traffic an API carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiType {
    /// Synchronous request/response proxying.
    Proxy,
    /// Asynchronous message-based traffic.
    Message,
}

/// The gateway's own HTTP method enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    TRACE,
    CONNECT,
}

impl HttpMethod {
    /// Parse a case-sensitive method name. `"get"` does not parse.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            "TRACE" => Some(HttpMethod::TRACE),
            "CONNECT" => Some(HttpMethod::CONNECT),
            _ => None,
        }
    }

    /// The transport library's equivalent.
    pub fn to_transport(self) -> http::Method {
        match self {
            HttpMethod::GET => http::Method::GET,
            HttpMethod::POST => http::Method::POST,
            HttpMethod::PUT => http::Method::PUT,
            HttpMethod::DELETE => http::Method::DELETE,
            HttpMethod::PATCH => http::Method::PATCH,
            HttpMethod::HEAD => http::Method::HEAD,
            HttpMethod::OPTIONS => http::Method::OPTIONS,
            HttpMethod::TRACE => http::Method::TRACE,
            HttpMethod::CONNECT => http::Method::CONNECT,
        }
    }
}

/// A deployable resource (cache, auth server, ...) referenced by policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}

/// Full API definition as deployed on the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(rename = "type", default = "default_api_type")]
    pub api_type: ApiType,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub plans: Vec<Plan>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub endpoint_groups: Vec<EndpointGroupDefinition>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// API-level services (v4).
    #[serde(default)]
    pub services: Vec<Service>,
    /// Legacy proxy section (v2-style endpoint groups).
    #[serde(default)]
    pub proxy: Option<ProxyDefinition>,
}

fn default_api_type() -> ApiType {
    ApiType::Proxy
}

pub(crate) fn default_true() -> bool {
    true
}
