//! Flow chains.
//!
//! # Responsibilities
//! - Resolve flow steps into executable policy lists per leg
//! - Execute the platform/API chains unconditionally, the plan chain for
//!   the plan resolved on the context
//!
//! # Design Decisions
//! - Resolution happens once at deploy time through `Flow::active_steps`,
//!   the same filter dependency discovery uses
//! - A step whose policy is not loadable is dropped with a warning; it can
//!   never appear in an executed chain

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::attributes::ATTR_PLAN;
use crate::context::{ExecutionContext, PhaseResult};
use crate::definition::{Flow, FlowLeg};
use crate::plugin::{PluginRegistry, Policy};
use crate::reactor::ExecutionPhase;

/// One flow resolved into executable policies for the request/response legs.
pub struct ResolvedFlow {
    request: Vec<Arc<dyn Policy>>,
    response: Vec<Arc<dyn Policy>>,
}

impl ResolvedFlow {
    fn resolve(flow: &Flow, registry: &PluginRegistry) -> Self {
        Self {
            request: resolve_leg(flow, FlowLeg::Request, registry),
            response: resolve_leg(flow, FlowLeg::Response, registry),
        }
    }

    fn policies(&self, phase: ExecutionPhase) -> &[Arc<dyn Policy>] {
        match phase {
            ExecutionPhase::Request => &self.request,
            ExecutionPhase::Response => &self.response,
        }
    }
}

fn resolve_leg(flow: &Flow, leg: FlowLeg, registry: &PluginRegistry) -> Vec<Arc<dyn Policy>> {
    flow.active_steps(leg)
        .filter_map(|step| match registry.policy(&step.policy) {
            Some(policy) => Some(policy),
            None => {
                tracing::warn!(policy = %step.policy, "Policy not loadable, dropping step");
                None
            }
        })
        .collect()
}

async fn execute_flows(flows: &[ResolvedFlow], ctx: &mut ExecutionContext, phase: ExecutionPhase) -> PhaseResult {
    for flow in flows {
        for policy in flow.policies(phase) {
            match phase {
                ExecutionPhase::Request => policy.on_request(ctx).await?,
                ExecutionPhase::Response => policy.on_response(ctx).await?,
            }
        }
    }
    Ok(())
}

/// Chain over a fixed flow list (platform flows, API flows).
pub struct FlowChain {
    id: String,
    flows: Vec<ResolvedFlow>,
}

impl FlowChain {
    pub fn new(id: impl Into<String>, flows: &[Flow], registry: &PluginRegistry) -> Self {
        Self {
            id: id.into(),
            flows: flows.iter().map(|flow| ResolvedFlow::resolve(flow, registry)).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn execute(&self, ctx: &mut ExecutionContext, phase: ExecutionPhase) -> PhaseResult {
        execute_flows(&self.flows, ctx, phase).await
    }
}

/// Chain over plan flows, filtered at execution time by the plan the
/// security chain resolved onto the context.
pub struct PlanFlowChain {
    id: String,
    plans: HashMap<String, Vec<ResolvedFlow>>,
}

impl PlanFlowChain {
    pub fn new(id: impl Into<String>, plans: &[crate::definition::Plan], registry: &PluginRegistry) -> Self {
        Self {
            id: id.into(),
            plans: plans
                .iter()
                .map(|plan| {
                    let flows = plan.flows.iter().map(|flow| ResolvedFlow::resolve(flow, registry)).collect();
                    (plan.id.clone(), flows)
                })
                .collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn execute(&self, ctx: &mut ExecutionContext, phase: ExecutionPhase) -> PhaseResult {
        let Some(plan_id) = ctx.attribute_text(ATTR_PLAN) else {
            return Ok(());
        };
        match self.plans.get(&plan_id) {
            Some(flows) => execute_flows(flows, ctx, phase).await,
            None => Ok(()),
        }
    }
}
