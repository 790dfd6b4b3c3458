//! Per-request execution context.
//!
//! # Responsibilities
//! - Carry the request and response handles through the pipeline
//! - Expose the public attribute namespace to policies
//! - Keep the internal attribute namespace crate-private
//! - Bind the template engine to request + context variables
//!
//! # Design Decisions
//! - One context per request; created at ingress, dropped at response end
//! - `&mut` access end to end: no two tasks can touch the same context
//! - Interruptions are produced here so failures are recorded exactly once

pub mod attributes;
pub mod failure;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use uuid::Uuid;

use crate::definition::PlanSecurityType;
use crate::template::{BuiltinTemplateEngine, TemplateEngine, TemplateError, TemplateVars};

pub use attributes::{AttributeValue, Attributes, InternalAttributes, InternalValue};
pub use failure::{ExecutionFailure, Interruption, PhaseResult};

/// Inbound request handle.
#[derive(Debug)]
pub struct GatewayRequest {
    pub id: String,
    pub transaction_id: String,
    pub method: Method,
    pub path: String,
    pub context_path: String,
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    pub timestamp: SystemTime,
    pub body: Bytes,
}

impl GatewayRequest {
    /// Build a request with generated ids and the given method/path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            context_path: "/".to_string(),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            remote_addr: None,
            local_addr: None,
            timestamp: SystemTime::now(),
            body: Bytes::new(),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Outbound response handle.
#[derive(Debug)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    ended: bool,
}

impl Default for GatewayResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            reason: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            ended: false,
        }
    }
}

impl GatewayResponse {
    /// Mark the response as ended. Idempotent.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Metrics recorded over the lifetime of one request.
#[derive(Debug, Default, Clone)]
pub struct RequestMetrics {
    pub api_id: Option<String>,
    pub api_name: Option<String>,
    pub application: Option<String>,
    pub plan: Option<String>,
    pub security_type: Option<PlanSecurityType>,
    pub security_token: Option<String>,
    pub endpoint_response_time: Option<Duration>,
}

/// Per-request execution context.
///
/// Everything in the pipeline reads and writes through this struct. It is
/// never shared across requests and never accessed from two tasks at once.
pub struct ExecutionContext {
    pub request: GatewayRequest,
    pub response: GatewayResponse,
    pub metrics: RequestMetrics,
    attributes: Attributes,
    internal: InternalAttributes,
    template_engine: Arc<dyn TemplateEngine>,
}

impl ExecutionContext {
    pub fn new(request: GatewayRequest) -> Self {
        Self {
            request,
            response: GatewayResponse::default(),
            metrics: RequestMetrics::default(),
            attributes: Attributes::default(),
            internal: InternalAttributes::default(),
            template_engine: Arc::new(BuiltinTemplateEngine::default()),
        }
    }

    /// Replace the expression engine (injected capability, see the template
    /// module for the contract).
    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.template_engine = engine;
        self
    }

    // --- Public attribute namespace (policy-facing) ---

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn attribute_text(&self, name: &str) -> Option<String> {
        self.attributes.get(name).and_then(AttributeValue::as_text).map(str::to_string)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.put(name, value);
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.remove(name);
    }

    // --- Internal attribute namespace (gateway only) ---

    pub(crate) fn internal(&self) -> &InternalAttributes {
        &self.internal
    }

    pub(crate) fn internal_mut(&mut self) -> &mut InternalAttributes {
        &mut self.internal
    }

    // --- Interruption helpers ---

    /// Benign early exit.
    pub fn interrupt(&self) -> Interruption {
        Interruption::Interrupted
    }

    /// Controlled failure: records the payload for the error processor chain
    /// and returns the signal to raise.
    pub fn interrupt_with(&mut self, failure: ExecutionFailure) -> Interruption {
        self.internal
            .put(attributes::ATTR_INTERNAL_EXECUTION_FAILURE, InternalValue::Failure(failure.clone()));
        Interruption::Failure(failure)
    }

    /// The failure recorded for this request, if any.
    pub(crate) fn execution_failure(&self) -> Option<ExecutionFailure> {
        match self.internal.get(attributes::ATTR_INTERNAL_EXECUTION_FAILURE) {
            Some(InternalValue::Failure(failure)) => Some(failure.clone()),
            _ => None,
        }
    }

    // --- Expression evaluation ---

    /// Evaluate an expression against `{request, context}` variables.
    /// Evaluation is the identity for plain strings.
    pub fn eval_string(&self, expression: &str) -> Result<String, TemplateError> {
        let engine = self.template_engine.clone();
        engine.eval_string(expression, &TemplateVars::new(&self.request, &self.attributes))
    }

    /// Evaluate a boolean expression, e.g. a plan selection rule.
    pub fn eval_bool(&self, expression: &str) -> Result<bool, TemplateError> {
        let engine = self.template_engine.clone();
        engine.eval_bool(expression, &TemplateVars::new(&self.request, &self.attributes))
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request.id)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}
