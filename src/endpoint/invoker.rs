//! Endpoint invoker.
//!
//! # Responsibilities
//! - Resolve the target endpoint: explicit attribute, template expression,
//!   or load-balancer default
//! - Apply the HTTP method override for request/response connectors
//! - Negotiate QoS for message connectors
//! - Trigger the connector
//!
//! # Design Decisions
//! - A value containing `://` is a literal target and is never name-split;
//!   otherwise the first colon separates the endpoint name from the rest
//! - Every failure leaves through an interruption with a stable key

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::attributes::{ATTR_REQUEST_ENDPOINT, ATTR_REQUEST_METHOD};
use crate::context::{AttributeValue, ExecutionContext, ExecutionFailure, Interruption, PhaseResult};
use crate::definition::HttpMethod;
use crate::endpoint::managed::EndpointCriteria;
use crate::endpoint::pool::EndpointPool;
use crate::endpoint::qos::check_compatibility;

pub const NO_ENDPOINT_FOUND_KEY: &str = "NO_ENDPOINT_FOUND";
pub const INVALID_HTTP_METHOD_KEY: &str = "INVALID_HTTP_METHOD";

const INVALID_HTTP_METHOD_MESSAGE: &str =
    "Http method can not be overridden because ATTR_REQUEST_METHOD attribute is invalid";

/// Backend invocation contract. The reactor reads the invoker from the
/// internal attributes at invocation time, so a policy may have replaced it.
#[async_trait]
pub trait Invoker: Send + Sync {
    fn id(&self) -> &str;

    async fn invoke(&self, ctx: &mut ExecutionContext) -> PhaseResult;
}

/// Split an evaluated endpoint reference into `(name, remainder)`.
///
/// A value containing `://` is a full URL form and keeps no name.
pub fn split_endpoint_reference(reference: &str) -> (Option<&str>, &str) {
    if reference.contains("://") {
        return (None, reference);
    }
    match reference.split_once(':') {
        Some((name, remainder)) => (Some(name), remainder),
        None => (None, reference),
    }
}

/// Default invoker: pool-backed endpoint resolution + connector dispatch.
pub struct EndpointInvoker {
    pool: Arc<EndpointPool>,
}

impl EndpointInvoker {
    pub fn new(pool: Arc<EndpointPool>) -> Self {
        Self { pool }
    }

    /// Resolve the endpoint name from the override attribute, rewriting the
    /// attribute to the remainder for the connector to consume.
    fn resolve_endpoint_name(&self, ctx: &mut ExecutionContext) -> Result<Option<String>, Interruption> {
        let Some(raw) = ctx.attribute_text(ATTR_REQUEST_ENDPOINT) else {
            return Ok(None);
        };

        // Evaluation is the identity for plain strings.
        let evaluated = ctx
            .eval_string(&raw)
            .map_err(|error| Interruption::Technical(format!("endpoint expression failed: {error}")))?;

        let (name, remainder) = split_endpoint_reference(&evaluated);
        let name = name.map(str::to_string);
        let remainder = remainder.to_string();
        ctx.set_attribute(ATTR_REQUEST_ENDPOINT, remainder);
        Ok(name)
    }

    fn apply_method_override(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        let method = {
            let Some(value) = ctx.attribute(ATTR_REQUEST_METHOD) else {
                return Ok(());
            };
            match value {
                AttributeValue::Method(method) => Some(method.to_transport()),
                AttributeValue::TransportMethod(method) => Some(method.clone()),
                AttributeValue::Text(name) => HttpMethod::from_name(name).map(HttpMethod::to_transport),
                _ => None,
            }
        };

        match method {
            Some(method) => {
                ctx.request.method = method;
                Ok(())
            }
            None => Err(ctx.interrupt_with(ExecutionFailure::new(
                400,
                INVALID_HTTP_METHOD_KEY,
                INVALID_HTTP_METHOD_MESSAGE,
            ))),
        }
    }
}

#[async_trait]
impl Invoker for EndpointInvoker {
    fn id(&self) -> &str {
        "endpoint-invoker"
    }

    async fn invoke(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        // Set earlier in the pipeline; always present by the time we run.
        let entrypoint = ctx
            .internal()
            .entrypoint()
            .ok_or_else(|| Interruption::Technical("no entrypoint connector in context".to_string()))?;

        let name = self.resolve_endpoint_name(ctx)?;

        let criteria = EndpointCriteria {
            name,
            api_type: Some(entrypoint.supported_api()),
            modes: Some(entrypoint.supported_modes()),
        };

        let Some(endpoint) = self.pool.next(&criteria) else {
            tracing::debug!(request_id = %ctx.request.id, criteria = ?criteria, "No endpoint matched");
            return Err(ctx.interrupt_with(ExecutionFailure::new(
                404,
                NO_ENDPOINT_FOUND_KEY,
                "No endpoint available for the incoming request",
            )));
        };

        let connector = endpoint.connector().clone();
        if connector.is_sync() {
            self.apply_method_override(ctx)?;
        } else if let Err(failure) = check_compatibility(entrypoint.qos_requirement(), &endpoint) {
            return Err(ctx.interrupt_with(failure));
        }

        connector.connect(ctx).await
    }
}
