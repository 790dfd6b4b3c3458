//! Message (async) connectors.
//!
//! # Responsibilities
//! - Entrypoint: carry the QoS contract the client-facing protocol requires
//! - Endpoint: declare supported QoS levels/capabilities and produce messages
//!
//! # Design Decisions
//! - The mock endpoint is the built-in message backend: it emits its
//!   configured message, which makes negotiated paths observable in tests

use std::collections::HashSet;

use bytes::Bytes;

use crate::connector::{ConnectorMode, Qos, QosCapability, QosRequirement};
use crate::context::{ExecutionContext, PhaseResult};

/// Client-facing async entrypoint (http-get, sse, webhook, ...).
#[derive(Debug)]
pub struct MessageEntrypoint {
    entrypoint_type: String,
    requirement: Option<QosRequirement>,
    modes: HashSet<ConnectorMode>,
}

impl MessageEntrypoint {
    pub fn new(entrypoint_type: impl Into<String>, requirement: Option<QosRequirement>) -> Self {
        Self {
            entrypoint_type: entrypoint_type.into(),
            requirement,
            modes: HashSet::from([ConnectorMode::Subscribe]),
        }
    }

    pub fn with_modes(mut self, modes: HashSet<ConnectorMode>) -> Self {
        self.modes = modes;
        self
    }

    pub fn id(&self) -> &str {
        &self.entrypoint_type
    }

    pub fn modes(&self) -> &HashSet<ConnectorMode> {
        &self.modes
    }

    pub fn qos_requirement(&self) -> Option<&QosRequirement> {
        self.requirement.as_ref()
    }
}

/// Backend-facing mock message endpoint.
#[derive(Debug)]
pub struct MessageMockConnector {
    message: String,
    supported_qos: Option<HashSet<Qos>>,
    supported_qos_capabilities: Option<HashSet<QosCapability>>,
    modes: HashSet<ConnectorMode>,
}

impl Default for MessageMockConnector {
    fn default() -> Self {
        Self {
            message: "mock message".to_string(),
            supported_qos: Some(HashSet::from([Qos::None, Qos::Auto])),
            supported_qos_capabilities: Some(HashSet::new()),
            modes: HashSet::from([ConnectorMode::Publish, ConnectorMode::Subscribe]),
        }
    }
}

impl MessageMockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a definition configuration block: `{ "message": "..." }`.
    pub fn from_configuration(configuration: Option<&serde_json::Value>) -> Self {
        let mut connector = Self::default();
        if let Some(message) = configuration.and_then(|config| config.get("message")).and_then(|m| m.as_str()) {
            connector.message = message.to_string();
        }
        connector
    }

    pub fn with_supported_qos(mut self, qos: Option<HashSet<Qos>>) -> Self {
        self.supported_qos = qos;
        self
    }

    pub fn with_supported_qos_capabilities(mut self, capabilities: Option<HashSet<QosCapability>>) -> Self {
        self.supported_qos_capabilities = capabilities;
        self
    }

    pub fn id(&self) -> &str {
        "mock"
    }

    pub fn modes(&self) -> &HashSet<ConnectorMode> {
        &self.modes
    }

    pub fn supported_qos(&self) -> Option<&HashSet<Qos>> {
        self.supported_qos.as_ref()
    }

    pub fn supported_qos_capabilities(&self) -> Option<&HashSet<QosCapability>> {
        self.supported_qos_capabilities.as_ref()
    }

    pub async fn connect(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        if let Ok(value) = self.id().parse() {
            ctx.response.headers.insert("x-endpoint-connector", value);
        }
        ctx.response.body = Bytes::from(self.message.clone());
        Ok(())
    }
}
