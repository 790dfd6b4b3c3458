//! Plan security chain.
//!
//! # Responsibilities
//! - Compose one handler per plan, in fixed mechanism order
//! - Select the first handler that accepts the request and run it
//! - Interrupt with a controlled 401 when no plan resolves

use std::sync::Arc;

use crate::context::attributes::ATTR_INTERNAL_SECURITY_SKIP;
use crate::context::{ExecutionContext, ExecutionFailure, PhaseResult};
use crate::definition::Api;
use crate::plugin::PluginRegistry;
use crate::reactor::hook::ChainHook;
use crate::security::handler::PlanSecurityHandler;
use crate::subscription::SubscriptionResolver;

pub const PLAN_UNRESOLVABLE_KEY: &str = "PLAN_UNRESOLVABLE";
const SECURITY_CHAIN_ID: &str = "security-plan";

/// Orders plan handlers and runs the first that can handle the request.
pub struct SecurityChain {
    handlers: Vec<PlanSecurityHandler>,
    registry: Arc<PluginRegistry>,
    hooks: Vec<Arc<dyn ChainHook>>,
}

impl SecurityChain {
    pub fn new(api: &Api, registry: Arc<PluginRegistry>, resolver: Arc<dyn SubscriptionResolver>) -> Self {
        let mut handlers: Vec<PlanSecurityHandler> = api
            .plans
            .iter()
            .map(|plan| PlanSecurityHandler::new(plan.clone(), api.id.clone(), resolver.clone()))
            .collect();
        handlers.sort_by_key(PlanSecurityHandler::order);

        Self {
            handlers,
            registry,
            hooks: Vec::new(),
        }
    }

    pub fn add_hook(&mut self, hook: Arc<dyn ChainHook>) {
        self.hooks.push(hook);
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    pub async fn execute(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        // Set earlier in the pipeline when authentication already happened
        // elsewhere; the chain completes without evaluating any handler.
        if ctx.internal().flag(ATTR_INTERNAL_SECURITY_SKIP) {
            return Ok(());
        }

        for handler in &self.handlers {
            if handler.can_handle(ctx) {
                tracing::debug!(
                    request_id = %ctx.request.id,
                    plan = %handler.plan().id,
                    "Plan selected for request"
                );
                for hook in &self.hooks {
                    hook.on_enter(SECURITY_CHAIN_ID, None);
                }
                let result = handler.handle(ctx, &self.registry).await;
                for hook in &self.hooks {
                    hook.on_exit(SECURITY_CHAIN_ID, result.is_ok());
                }
                return result;
            }
        }

        tracing::debug!(request_id = %ctx.request.id, "No plan can handle the request");
        Err(ctx.interrupt_with(ExecutionFailure::new(401, PLAN_UNRESOLVABLE_KEY, "Unauthorized")))
    }
}
