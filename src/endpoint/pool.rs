//! Load-balanced endpoint pool.
//!
//! # Responsibilities
//! - Group endpoints and serve `next(criteria)` lookups
//! - Apply the group's load-balancing strategy over UP endpoints
//! - Swap the whole snapshot atomically on redeploy
//!
//! # Design Decisions
//! - Readers never block: selection walks the current snapshot
//! - A named lookup tries an endpoint name first, then a group name
//! - Selection returns nothing before `start()`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use rand::Rng;

use crate::connector::endpoint_connector_for;
use crate::definition::{Api, LoadBalancerType};
use crate::endpoint::managed::{EndpointCriteria, ManagedEndpoint};

/// One endpoint group inside a snapshot.
pub struct EndpointGroup {
    name: String,
    strategy: LoadBalancerType,
    endpoints: Vec<Arc<ManagedEndpoint>>,
    cursor: AtomicUsize,
}

impl EndpointGroup {
    pub fn new(name: impl Into<String>, strategy: LoadBalancerType, endpoints: Vec<Arc<ManagedEndpoint>>) -> Self {
        Self {
            name: name.into(),
            strategy,
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    fn select(&self, criteria: &EndpointCriteria) -> Option<Arc<ManagedEndpoint>> {
        if self.endpoints.is_empty() {
            return None;
        }

        let start = match self.strategy {
            LoadBalancerType::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed),
            LoadBalancerType::Random => rand::thread_rng().gen_range(0..self.endpoints.len()),
        };

        // Walk at most one full turn so an all-down group terminates.
        for offset in 0..self.endpoints.len() {
            let endpoint = &self.endpoints[(start + offset) % self.endpoints.len()];
            if endpoint.is_up() && criteria.accepts(endpoint) {
                return Some(endpoint.clone());
            }
        }
        None
    }
}

struct PoolSnapshot {
    groups: Vec<EndpointGroup>,
}

impl PoolSnapshot {
    fn empty() -> Self {
        Self { groups: Vec::new() }
    }
}

/// Shared, atomically swappable endpoint pool.
pub struct EndpointPool {
    snapshot: ArcSwap<PoolSnapshot>,
    started: AtomicBool,
}

impl Default for EndpointPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointPool {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(PoolSnapshot::empty()),
            started: AtomicBool::new(false),
        }
    }

    /// Build the pool from a deployed definition. Endpoints whose connector
    /// type is unknown are left out of the pool.
    pub fn from_definition(api: &Api) -> Self {
        let pool = Self::new();
        let groups = api
            .endpoint_groups
            .iter()
            .map(|group| {
                let endpoints = group
                    .endpoints
                    .iter()
                    .filter(|endpoint| endpoint.enabled)
                    .filter_map(|endpoint| {
                        match endpoint_connector_for(&endpoint.endpoint_type, endpoint.configuration.as_ref()) {
                            Some(connector) => {
                                Some(Arc::new(ManagedEndpoint::new(&endpoint.name, &group.name, connector)))
                            }
                            None => {
                                tracing::warn!(
                                    api_id = %api.id,
                                    endpoint = %endpoint.name,
                                    endpoint_type = %endpoint.endpoint_type,
                                    "No endpoint connector for type, skipping endpoint"
                                );
                                None
                            }
                        }
                    })
                    .collect();
                EndpointGroup::new(&group.name, group.load_balancer, endpoints)
            })
            .collect();
        pool.replace(groups);
        pool
    }

    /// Replace the whole snapshot. Readers keep whatever snapshot they were
    /// already walking; new lookups see the new one.
    pub fn replace(&self, groups: Vec<EndpointGroup>) {
        self.snapshot.store(Arc::new(PoolSnapshot { groups }));
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// All endpoints across groups, e.g. for status management.
    pub fn endpoints(&self) -> Vec<Arc<ManagedEndpoint>> {
        self.snapshot
            .load()
            .groups
            .iter()
            .flat_map(|group| group.endpoints.iter().cloned())
            .collect()
    }

    /// Select the next endpoint matching the criteria, or nothing.
    pub fn next(&self, criteria: &EndpointCriteria) -> Option<Arc<ManagedEndpoint>> {
        if !self.is_started() {
            return None;
        }

        let snapshot = self.snapshot.load();
        match &criteria.name {
            Some(name) => {
                // An endpoint name wins over a group name.
                for group in &snapshot.groups {
                    if let Some(endpoint) = group.endpoints.iter().find(|endpoint| endpoint.name() == *name) {
                        return (endpoint.is_up() && criteria.accepts(endpoint)).then(|| endpoint.clone());
                    }
                }
                snapshot
                    .groups
                    .iter()
                    .find(|group| group.name == *name)
                    .and_then(|group| group.select(criteria))
            }
            None => snapshot.groups.first().and_then(|group| group.select(criteria)),
        }
    }
}
