//! Processor chains.
//!
//! Processors are gateway-owned steps (as opposed to user-deployed
//! policies): transaction stamping, error shaping, response finalization.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;

use crate::context::{ExecutionContext, PhaseResult};
use crate::reactor::ExecutionPhase;

/// A single gateway-owned processing step.
#[async_trait]
pub trait Processor: Send + Sync {
    fn id(&self) -> &str;

    async fn process(&self, ctx: &mut ExecutionContext) -> PhaseResult;
}

/// An ordered, named list of processors.
pub struct ProcessorChain {
    id: String,
    processors: Vec<Arc<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new(id: impl Into<String>, processors: Vec<Arc<dyn Processor>>) -> Self {
        Self {
            id: id.into(),
            processors,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn execute(&self, ctx: &mut ExecutionContext, _phase: ExecutionPhase) -> PhaseResult {
        for processor in &self.processors {
            processor.process(ctx).await?;
        }
        Ok(())
    }
}

/// Stamps the transaction id onto the response.
pub struct TransactionProcessor;

pub const TRANSACTION_HEADER: &str = "x-transaction-id";

#[async_trait]
impl Processor for TransactionProcessor {
    fn id(&self) -> &str {
        "transaction"
    }

    async fn process(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        if let Ok(value) = ctx.request.transaction_id.parse() {
            ctx.response.headers.insert(TRANSACTION_HEADER, value);
        }
        Ok(())
    }
}

/// Shapes the recorded execution failure into the client response.
pub struct FailureResponseProcessor;

#[async_trait]
impl Processor for FailureResponseProcessor {
    fn id(&self) -> &str {
        "failure-response"
    }

    async fn process(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        let failure = ctx.execution_failure().unwrap_or_else(|| {
            crate::context::ExecutionFailure::new(500, "INTERNAL_ERROR", "Internal error")
        });

        ctx.response.status = StatusCode::from_u16(failure.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ctx.response.reason = Some(failure.message.clone());
        if let Ok(value) = "application/json".parse() {
            ctx.response.headers.insert(http::header::CONTENT_TYPE, value);
        }
        let body = serde_json::json!({
            "message": failure.message,
            "http_status_code": failure.status_code,
            "key": failure.key,
        });
        ctx.response.body = Bytes::from(body.to_string());
        Ok(())
    }
}

/// Builds the gateway's default chains.
pub struct ProcessorChainFactory;

impl ProcessorChainFactory {
    pub fn pre_processors() -> ProcessorChain {
        ProcessorChain::new("pre-processors", vec![Arc::new(TransactionProcessor)])
    }

    pub fn post_processors() -> ProcessorChain {
        ProcessorChain::new("post-processors", vec![Arc::new(TransactionProcessor)])
    }

    pub fn error_processors() -> ProcessorChain {
        ProcessorChain::new(
            "error-processors",
            vec![Arc::new(FailureResponseProcessor), Arc::new(TransactionProcessor)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecutionFailure, GatewayRequest};
    use http::Method;

    #[tokio::test]
    async fn failure_processor_shapes_the_response() {
        let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/test"));
        let _ = ctx.interrupt_with(ExecutionFailure::new(404, "NO_ENDPOINT_FOUND", "No endpoint available"));

        FailureResponseProcessor.process(&mut ctx).await.unwrap();

        assert_eq!(ctx.response.status, StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(&ctx.response.body).unwrap();
        assert_eq!(body["http_status_code"], 404);
        assert_eq!(body["message"], "No endpoint available");
    }

    #[tokio::test]
    async fn failure_processor_defaults_to_internal_error() {
        let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/test"));
        FailureResponseProcessor.process(&mut ctx).await.unwrap();
        assert_eq!(ctx.response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
