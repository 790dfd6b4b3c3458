//! Deploy-time plugin registry.
//!
//! # Responsibilities
//! - Hold the policies loadable by name
//! - Declare which connector and service types are available
//! - Verify an API definition against the loadable set before deploy

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::definition::Api;
use crate::plugin::dependency::{resolve_dependencies, PluginCategory, PluginDependency};
use crate::plugin::Policy;

/// Registry of everything the gateway can instantiate at deploy time.
#[derive(Default)]
pub struct PluginRegistry {
    policies: HashMap<String, Arc<dyn Policy>>,
    available: HashSet<PluginDependency>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy plugin; also marks it available for verification.
    pub fn register_policy(&mut self, policy: Arc<dyn Policy>) {
        self.available
            .insert(PluginDependency::new(PluginCategory::Policy, policy.id()));
        self.policies.insert(policy.id().to_string(), policy);
    }

    /// Declare a non-policy plugin as loadable, e.g. a connector type.
    pub fn declare(&mut self, category: PluginCategory, identifier: impl Into<String>) {
        self.available.insert(PluginDependency::new(category, identifier));
    }

    /// Look up a policy by name.
    pub fn policy(&self, name: &str) -> Option<Arc<dyn Policy>> {
        self.policies.get(name).cloned()
    }

    /// Verify that every plugin the API depends on is loadable.
    /// Returns the missing dependencies on failure.
    pub fn verify(&self, api: &Api) -> Result<(), Vec<PluginDependency>> {
        let mut missing: Vec<PluginDependency> = resolve_dependencies(api)
            .into_iter()
            .filter(|dependency| !self.available.contains(dependency))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            missing.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
            Err(missing)
        }
    }
}
