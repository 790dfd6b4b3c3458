//! Per-request attribute namespaces.
//!
//! # Responsibilities
//! - Store the public attributes policies read and write
//! - Store the internal attributes the gateway keeps to itself
//! - Keep the two namespaces strictly apart
//!
//! # Design Decisions
//! - Two distinct maps, never merged; the internal one is `pub(crate)` only
//!   so policy-facing code cannot reach it by construction
//! - Values are closed enums rather than `Any`, so every stored shape is
//!   known at compile time

use std::collections::HashMap;
use std::sync::Arc;

use crate::connector::EntrypointConnector;
use crate::context::failure::ExecutionFailure;
use crate::definition::HttpMethod;
use crate::endpoint::invoker::Invoker;
use crate::subscription::{ApiKey, Subscription};

// Public attribute names.
pub const ATTR_API: &str = "api";
pub const ATTR_CONTEXT_PATH: &str = "context-path";
pub const ATTR_APPLICATION: &str = "application";
pub const ATTR_PLAN: &str = "plan";
pub const ATTR_SUBSCRIPTION: &str = "subscription";
/// Endpoint override: a name-prefixed, literal-URL, or template form.
pub const ATTR_REQUEST_ENDPOINT: &str = "request.endpoint";
/// HTTP method override: one of the method enums or a method-name string.
pub const ATTR_REQUEST_METHOD: &str = "request.method";

// Internal attribute names.
pub const ATTR_INTERNAL_ENTRYPOINT_CONNECTOR: &str = "entrypoint-connector";
pub const ATTR_INTERNAL_INVOKER: &str = "invoker";
pub const ATTR_INTERNAL_INVOKER_SKIP: &str = "invoker-skip";
pub const ATTR_INTERNAL_SECURITY_SKIP: &str = "security-skip";
pub const ATTR_INTERNAL_TOKEN_IDENTIFIED: &str = "token-identified";
pub const ATTR_INTERNAL_SECURITY_LAST_HANDLER: &str = "last-security-handler";
pub const ATTR_INTERNAL_SUBSCRIPTION: &str = "subscription";
pub const ATTR_INTERNAL_API_KEY: &str = "api-key";
pub const ATTR_INTERNAL_JWT_CLAIMS: &str = "jwt-claims";
pub const ATTR_INTERNAL_EXECUTION_FAILURE: &str = "execution-failure";

/// Value stored in the public attribute namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    /// The gateway's own method enum.
    Method(HttpMethod),
    /// The transport library's method type.
    TransportMethod(http::Method),
    List(Vec<AttributeValue>),
    Json(serde_json::Value),
}

impl AttributeValue {
    /// Text content, if this value is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Public attribute store. This is the only namespace reachable from
/// policy-facing APIs.
#[derive(Debug, Default)]
pub struct Attributes {
    values: HashMap<String, AttributeValue>,
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over all attributes, e.g. to expose them to the template engine.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.values.iter()
    }
}

/// Value stored in the internal attribute namespace.
///
/// Carries gateway-internal references that must never leak to policies.
#[derive(Clone)]
pub enum InternalValue {
    Flag(bool),
    Text(String),
    Json(serde_json::Value),
    Failure(ExecutionFailure),
    Entrypoint(Arc<EntrypointConnector>),
    Subscription(Arc<Subscription>),
    ApiKey(Arc<ApiKey>),
    Invoker(Arc<dyn Invoker>),
}

impl std::fmt::Debug for InternalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InternalValue::Flag(value) => write!(f, "Flag({value})"),
            InternalValue::Text(value) => write!(f, "Text({value})"),
            InternalValue::Json(value) => write!(f, "Json({value})"),
            InternalValue::Failure(value) => write!(f, "Failure({value})"),
            InternalValue::Entrypoint(connector) => write!(f, "Entrypoint({})", connector.id()),
            InternalValue::Subscription(sub) => write!(f, "Subscription({})", sub.id),
            InternalValue::ApiKey(key) => write!(f, "ApiKey(plan={})", key.plan),
            InternalValue::Invoker(invoker) => write!(f, "Invoker({})", invoker.id()),
        }
    }
}

/// Internal attribute store, `pub(crate)` surface only.
#[derive(Debug, Default)]
pub struct InternalAttributes {
    values: HashMap<&'static str, InternalValue>,
}

impl InternalAttributes {
    pub(crate) fn get(&self, name: &str) -> Option<&InternalValue> {
        self.values.get(name)
    }

    pub(crate) fn put(&mut self, name: &'static str, value: InternalValue) {
        self.values.insert(name, value);
    }

    pub(crate) fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(InternalValue::Flag(true)))
    }

    pub(crate) fn entrypoint(&self) -> Option<Arc<EntrypointConnector>> {
        match self.values.get(ATTR_INTERNAL_ENTRYPOINT_CONNECTOR) {
            Some(InternalValue::Entrypoint(connector)) => Some(connector.clone()),
            _ => None,
        }
    }

    pub(crate) fn invoker(&self) -> Option<Arc<dyn Invoker>> {
        match self.values.get(ATTR_INTERNAL_INVOKER) {
            Some(InternalValue::Invoker(invoker)) => Some(invoker.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove_public_attributes() {
        let mut attributes = Attributes::default();
        for i in 0..5 {
            attributes.put(format!("key{i}"), format!("value{i}"));
        }
        for i in 0..5 {
            assert_eq!(
                attributes.get(&format!("key{i}")).and_then(AttributeValue::as_text),
                Some(format!("value{i}").as_str())
            );
        }
        attributes.remove("key0");
        assert!(attributes.get("key0").is_none());
    }

    #[test]
    fn namespaces_are_distinct() {
        let mut attributes = Attributes::default();
        let mut internal = InternalAttributes::default();

        attributes.put("shared", "public");
        internal.put(ATTR_INTERNAL_TOKEN_IDENTIFIED, InternalValue::Flag(true));

        assert!(attributes.get(ATTR_INTERNAL_TOKEN_IDENTIFIED).is_none());
        assert!(internal.get("shared").is_none());
    }

    #[test]
    fn internal_flag_defaults_to_false() {
        let internal = InternalAttributes::default();
        assert!(!internal.flag(ATTR_INTERNAL_SECURITY_SKIP));
    }
}
