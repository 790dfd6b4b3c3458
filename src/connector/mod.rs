//! Pluggable protocol connectors.
//!
//! # Data Flow
//! ```text
//! Client traffic → entrypoint connector (client-facing protocol)
//!     → execution pipeline
//!     → endpoint connector (backend-facing protocol)
//! ```
//!
//! # Design Decisions
//! - Each family is a closed enum resolved once per request; pluggability
//!   happens at deploy time, not through open-ended dynamic dispatch
//! - Async entrypoints declare a QoS requirement; async endpoints declare
//!   what they support; the matcher negotiates between the two
//! - The raw TCP tunnel lives apart from the request/response families

pub mod http;
pub mod message;
pub mod tcp;

use std::collections::HashSet;

use crate::context::{ExecutionContext, PhaseResult};
use crate::definition::ApiType;

pub use self::http::{HttpEntrypoint, HttpProxyConnector};
pub use self::message::{MessageEntrypoint, MessageMockConnector};
pub use self::tcp::{TcpClientConnection, TcpEndpointConnector, TcpTunnel, TlsSessionInfo};

/// Interaction mode a connector supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorMode {
    RequestResponse,
    Publish,
    Subscribe,
    Socket,
}

/// Delivery-guarantee level negotiated between async connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qos {
    None,
    Auto,
    AtMostOnce,
    AtLeastOnce,
}

impl Qos {
    /// Parse the definition-file label, e.g. `at-least-once`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "none" => Some(Qos::None),
            "auto" => Some(Qos::Auto),
            "at-most-once" => Some(Qos::AtMostOnce),
            "at-least-once" => Some(Qos::AtLeastOnce),
            _ => None,
        }
    }
}

/// Additional capability a QoS negotiation can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QosCapability {
    AutoAck,
    ManualAck,
    Recover,
}

/// What an entrypoint requires from the endpoint side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosRequirement {
    pub qos: Qos,
    pub capabilities: HashSet<QosCapability>,
}

impl QosRequirement {
    pub fn new(qos: Qos) -> Self {
        Self {
            qos,
            capabilities: HashSet::new(),
        }
    }

    pub fn with_capability(mut self, capability: QosCapability) -> Self {
        self.capabilities.insert(capability);
        self
    }
}

/// Client-facing connector resolved for the current request.
#[derive(Debug)]
pub enum EntrypointConnector {
    Http(HttpEntrypoint),
    Message(MessageEntrypoint),
}

impl EntrypointConnector {
    pub fn id(&self) -> &str {
        match self {
            EntrypointConnector::Http(entrypoint) => entrypoint.id(),
            EntrypointConnector::Message(entrypoint) => entrypoint.id(),
        }
    }

    pub fn supported_api(&self) -> ApiType {
        match self {
            EntrypointConnector::Http(_) => ApiType::Proxy,
            EntrypointConnector::Message(_) => ApiType::Message,
        }
    }

    pub fn supported_modes(&self) -> HashSet<ConnectorMode> {
        match self {
            EntrypointConnector::Http(_) => HashSet::from([ConnectorMode::RequestResponse]),
            EntrypointConnector::Message(entrypoint) => entrypoint.modes().clone(),
        }
    }

    /// The QoS contract this entrypoint requires; `None` for synchronous
    /// entrypoints, and also `None` when an async entrypoint failed to
    /// declare anything negotiable (a configuration defect).
    pub fn qos_requirement(&self) -> Option<&QosRequirement> {
        match self {
            EntrypointConnector::Http(_) => None,
            EntrypointConnector::Message(entrypoint) => entrypoint.qos_requirement(),
        }
    }
}

/// Backend-facing connector wrapped by a managed endpoint.
#[derive(Debug)]
pub enum EndpointConnector {
    HttpProxy(HttpProxyConnector),
    Message(MessageMockConnector),
}

impl EndpointConnector {
    pub fn id(&self) -> &str {
        match self {
            EndpointConnector::HttpProxy(_) => "http-proxy",
            EndpointConnector::Message(connector) => connector.id(),
        }
    }

    pub fn supported_api(&self) -> ApiType {
        match self {
            EndpointConnector::HttpProxy(_) => ApiType::Proxy,
            EndpointConnector::Message(_) => ApiType::Message,
        }
    }

    pub fn supported_modes(&self) -> HashSet<ConnectorMode> {
        match self {
            EndpointConnector::HttpProxy(_) => HashSet::from([ConnectorMode::RequestResponse]),
            EndpointConnector::Message(connector) => connector.modes().clone(),
        }
    }

    /// Declared QoS support; `None` when the connector declares nothing.
    pub fn supported_qos(&self) -> Option<&HashSet<Qos>> {
        match self {
            EndpointConnector::HttpProxy(_) => None,
            EndpointConnector::Message(connector) => connector.supported_qos(),
        }
    }

    pub fn supported_qos_capabilities(&self) -> Option<&HashSet<QosCapability>> {
        match self {
            EndpointConnector::HttpProxy(_) => None,
            EndpointConnector::Message(connector) => connector.supported_qos_capabilities(),
        }
    }

    /// True for request/response connectors, false for message connectors.
    pub fn is_sync(&self) -> bool {
        matches!(self, EndpointConnector::HttpProxy(_))
    }

    /// Trigger the backend call for the current request.
    pub async fn connect(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        match self {
            EndpointConnector::HttpProxy(connector) => connector.connect(ctx).await,
            EndpointConnector::Message(connector) => connector.connect(ctx).await,
        }
    }
}

/// Registry contract: build an endpoint connector for a declared type.
/// Returns `None` for unknown types, which keeps the endpoint out of the pool.
pub fn endpoint_connector_for(endpoint_type: &str, configuration: Option<&serde_json::Value>) -> Option<EndpointConnector> {
    match endpoint_type {
        "http-proxy" => HttpProxyConnector::from_configuration(configuration).map(EndpointConnector::HttpProxy),
        "mock" => Some(EndpointConnector::Message(MessageMockConnector::from_configuration(configuration))),
        _ => None,
    }
}

/// Registry contract: build an entrypoint connector for a declared type.
pub fn entrypoint_connector_for(entrypoint_type: &str, qos: Option<&str>) -> Option<EntrypointConnector> {
    match entrypoint_type {
        "http-proxy" => Some(EntrypointConnector::Http(HttpEntrypoint::new())),
        "http-get" | "http-post" | "sse" | "webhook" => {
            let requirement = qos.and_then(Qos::from_label).map(QosRequirement::new);
            Some(EntrypointConnector::Message(MessageEntrypoint::new(entrypoint_type, requirement)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_entrypoint_has_no_qos_requirement() {
        let entrypoint = EntrypointConnector::Http(HttpEntrypoint::new());
        assert!(entrypoint.qos_requirement().is_none());
        assert_eq!(entrypoint.supported_api(), ApiType::Proxy);
    }

    #[test]
    fn unknown_connector_type_resolves_to_none() {
        assert!(endpoint_connector_for("kafka", None).is_none());
    }

    #[test]
    fn qos_labels_parse() {
        assert_eq!(Qos::from_label("at-least-once"), Some(Qos::AtLeastOnce));
        assert_eq!(Qos::from_label("sometimes"), None);
    }
}
