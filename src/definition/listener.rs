//! Listeners: the client-facing side of an API.

use serde::{Deserialize, Serialize};

/// Kind of listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListenerType {
    Http,
    Subscription,
    Tcp,
}

/// An entrypoint connector reference attached to a listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntrypointDefinition {
    /// Entrypoint connector type, e.g. `http-proxy`, `http-get`, `tcp-proxy`.
    #[serde(rename = "type")]
    pub entrypoint_type: String,
    #[serde(default)]
    pub qos: Option<String>,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}

/// A listener with its entrypoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Listener {
    #[serde(rename = "type")]
    pub listener_type: ListenerType,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub entrypoints: Vec<EntrypointDefinition>,
}
