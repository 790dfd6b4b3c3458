//! Managed endpoints and selection criteria.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::connector::{ConnectorMode, EndpointConnector, Qos, QosCapability};
use crate::definition::ApiType;

/// Availability of a managed endpoint.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    Up = 0,
    Down = 1,
}

impl From<u8> for EndpointStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => EndpointStatus::Down,
            _ => EndpointStatus::Up,
        }
    }
}

/// A deployed endpoint: a connector plus its declared capabilities.
#[derive(Debug)]
pub struct ManagedEndpoint {
    name: String,
    group: String,
    weight: u32,
    connector: Arc<EndpointConnector>,
    status: AtomicU8,
}

impl ManagedEndpoint {
    pub fn new(name: impl Into<String>, group: impl Into<String>, connector: EndpointConnector) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            weight: 1,
            connector: Arc::new(connector),
            status: AtomicU8::new(EndpointStatus::Up as u8),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn connector(&self) -> &Arc<EndpointConnector> {
        &self.connector
    }

    pub fn status(&self) -> EndpointStatus {
        self.status.load(Ordering::Relaxed).into()
    }

    pub fn set_status(&self, status: EndpointStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
    }

    pub fn is_up(&self) -> bool {
        self.status() == EndpointStatus::Up
    }

    pub fn supported_api(&self) -> ApiType {
        self.connector.supported_api()
    }

    pub fn supported_modes(&self) -> HashSet<ConnectorMode> {
        self.connector.supported_modes()
    }

    pub fn supported_qos(&self) -> Option<&HashSet<Qos>> {
        self.connector.supported_qos()
    }

    pub fn supported_qos_capabilities(&self) -> Option<&HashSet<QosCapability>> {
        self.connector.supported_qos_capabilities()
    }
}

/// Selection criteria handed to the pool. A `None` name lets the load
/// balancer choose from the default group.
#[derive(Debug, Clone, Default)]
pub struct EndpointCriteria {
    pub name: Option<String>,
    pub api_type: Option<ApiType>,
    pub modes: Option<HashSet<ConnectorMode>>,
}

impl EndpointCriteria {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// True when the endpoint satisfies the api-type and mode constraints.
    pub fn accepts(&self, endpoint: &ManagedEndpoint) -> bool {
        if let Some(api_type) = self.api_type {
            if endpoint.supported_api() != api_type {
                return false;
            }
        }
        if let Some(modes) = &self.modes {
            let supported = endpoint.supported_modes();
            if !modes.iter().all(|mode| supported.contains(mode)) {
                return false;
            }
        }
        true
    }
}
