//! Deploy-time plugin dependency resolution.
//!
//! # Responsibilities
//! - Walk an API definition and collect every plugin it depends on
//! - De-duplicate: the result is an unordered set of (category, identifier)
//!
//! # Design Decisions
//! - Each traversal arm is conditioned on the element's enabled state
//! - Policy discovery goes through `Flow::active_steps`, the same filter the
//!   flow chains execute with

use std::collections::HashSet;
use std::fmt;

use crate::definition::{Api, Flow, FlowLeg};

/// Plugin category, the first half of a dependency record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginCategory {
    Resource,
    Policy,
    Service,
    Connector,
    ServiceDiscovery,
    EntrypointConnector,
    EndpointConnector,
    ApiService,
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PluginCategory::Resource => "resource",
            PluginCategory::Policy => "policy",
            PluginCategory::Service => "service",
            PluginCategory::Connector => "connector",
            PluginCategory::ServiceDiscovery => "service_discovery",
            PluginCategory::EntrypointConnector => "entrypoint-connector",
            PluginCategory::EndpointConnector => "endpoint-connector",
            PluginCategory::ApiService => "api-service",
        };
        f.write_str(label)
    }
}

/// A plugin an API definition depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginDependency {
    pub category: PluginCategory,
    pub identifier: String,
}

impl PluginDependency {
    pub fn new(category: PluginCategory, identifier: impl Into<String>) -> Self {
        Self {
            category,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.identifier)
    }
}

/// Collect the de-duplicated set of plugins the given API needs before it
/// can be deployed.
pub fn resolve_dependencies(api: &Api) -> HashSet<PluginDependency> {
    let mut dependencies = HashSet::new();

    for resource in api.resources.iter().filter(|resource| resource.enabled) {
        dependencies.insert(PluginDependency::new(PluginCategory::Resource, &resource.resource_type));
    }

    collect_policies(&api.flows, &mut dependencies);
    for plan in &api.plans {
        collect_policies(&plan.flows, &mut dependencies);
    }

    if let Some(proxy) = &api.proxy {
        for group in &proxy.groups {
            for endpoint in &group.endpoints {
                dependencies.insert(PluginDependency::new(
                    PluginCategory::Connector,
                    format!("connector-{}", endpoint.endpoint_type),
                ));
            }
            for service in group.services.iter().filter(|service| service.enabled) {
                dependencies.insert(PluginDependency::new(PluginCategory::Service, &service.service_type));
            }
            if let Some(discovery) = group.discovery.as_ref().filter(|discovery| discovery.enabled) {
                dependencies.insert(PluginDependency::new(PluginCategory::ServiceDiscovery, &discovery.provider));
            }
        }
    }

    for listener in &api.listeners {
        for entrypoint in &listener.entrypoints {
            dependencies.insert(PluginDependency::new(
                PluginCategory::EntrypointConnector,
                &entrypoint.entrypoint_type,
            ));
        }
    }

    for group in &api.endpoint_groups {
        for endpoint in group.endpoints.iter().filter(|endpoint| endpoint.enabled) {
            dependencies.insert(PluginDependency::new(PluginCategory::EndpointConnector, &endpoint.endpoint_type));
        }
        for service in group.services.iter().filter(|service| service.enabled) {
            dependencies.insert(PluginDependency::new(PluginCategory::ApiService, &service.service_type));
        }
    }

    for service in api.services.iter().filter(|service| service.enabled) {
        dependencies.insert(PluginDependency::new(PluginCategory::ApiService, &service.service_type));
    }

    dependencies
}

fn collect_policies(flows: &[Flow], dependencies: &mut HashSet<PluginDependency>) {
    for flow in flows {
        for leg in FlowLeg::ALL {
            for step in flow.active_steps(leg) {
                dependencies.insert(PluginDependency::new(PluginCategory::Policy, &step.policy));
            }
        }
    }
}
