//! Subscription and API-key lookup contracts.
//!
//! # Responsibilities
//! - Define the narrow persistence contracts the core consumes
//! - Provide a thread-safe in-memory implementation for the gateway node
//!
//! # Design Decisions
//! - The core never reasons about where subscriptions come from; it only
//!   calls `find_active_subscription` / `find_api_key`
//! - The cache is concurrent and shared across requests

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionStatus {
    Accepted,
    Pending,
    Rejected,
    Closed,
    Paused,
}

/// A consumer's subscription to a plan of an API.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub api: String,
    pub plan: String,
    pub application: String,
    pub client_id: Option<String>,
    pub status: SubscriptionStatus,
    pub starting_at: Option<SystemTime>,
    pub ending_at: Option<SystemTime>,
}

impl Subscription {
    /// True when the subscription window covers the given instant.
    pub fn is_time_valid(&self, at: SystemTime) -> bool {
        let started = self.starting_at.map(|start| start <= at).unwrap_or(true);
        let not_ended = self.ending_at.map(|end| end > at).unwrap_or(true);
        started && not_ended
    }
}

/// A provisioned API key bound to a plan.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub key: String,
    pub api: String,
    pub plan: String,
    pub application: String,
    pub active: bool,
    pub expire_at: Option<SystemTime>,
}

impl ApiKey {
    pub fn is_valid(&self, at: SystemTime) -> bool {
        self.active && self.expire_at.map(|expiry| expiry > at).unwrap_or(true)
    }
}

/// Lookup contract consumed by the security chain.
pub trait SubscriptionResolver: Send + Sync {
    /// Find an accepted subscription for `{api, plan, client_id}`.
    fn find_active_subscription(&self, api: &str, plan: &str, client_id: &str) -> Option<Arc<Subscription>>;

    /// Find a provisioned API key for `{api, key}`.
    fn find_api_key(&self, api: &str, key: &str) -> Option<Arc<ApiKey>>;
}

/// In-memory, concurrent implementation of [`SubscriptionResolver`].
#[derive(Default)]
pub struct SubscriptionCache {
    subscriptions: DashMap<String, Vec<Arc<Subscription>>>,
    api_keys: DashMap<(String, String), Arc<ApiKey>>,
}

impl SubscriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .entry(subscription.api.clone())
            .or_default()
            .push(Arc::new(subscription));
    }

    pub fn put_api_key(&self, api_key: ApiKey) {
        self.api_keys
            .insert((api_key.api.clone(), api_key.key.clone()), Arc::new(api_key));
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.iter().map(|entry| entry.value().len()).sum()
    }
}

impl SubscriptionResolver for SubscriptionCache {
    fn find_active_subscription(&self, api: &str, plan: &str, client_id: &str) -> Option<Arc<Subscription>> {
        self.subscriptions.get(api).and_then(|subscriptions| {
            subscriptions
                .iter()
                .find(|subscription| {
                    subscription.status == SubscriptionStatus::Accepted
                        && subscription.plan == plan
                        && subscription.client_id.as_deref() == Some(client_id)
                })
                .cloned()
        })
    }

    fn find_api_key(&self, api: &str, key: &str) -> Option<Arc<ApiKey>> {
        self.api_keys.get(&(api.to_string(), key.to_string())).map(|entry| entry.value().clone())
    }
}
