//! Services attached to APIs, groups and endpoints.

use serde::{Deserialize, Serialize};

use crate::definition::default_true;

/// A service instance (health check, dynamic properties, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Service {
    /// Service plugin type, e.g. `health-check`, `dynamic-property`.
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}

/// Service-discovery configuration for a legacy proxy group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceDiscovery {
    pub provider: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}
