//! Flows and steps.
//!
//! A flow is an ordered, independently enable-able group of policy steps
//! attached to an API, a plan, or the platform. A disabled flow contributes
//! zero steps regardless of individual step state; plugin discovery and flow
//! execution both go through [`Flow::active_steps`] so they can never
//! disagree on that rule.

use serde::{Deserialize, Serialize};

use crate::definition::default_true;

/// Execution leg a step list belongs to.
///
/// Synchronous APIs use the request/response legs; message APIs additionally
/// use publish/subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowLeg {
    Request,
    Response,
    Publish,
    Subscribe,
}

impl FlowLeg {
    pub const ALL: [FlowLeg; 4] = [FlowLeg::Request, FlowLeg::Response, FlowLeg::Publish, FlowLeg::Subscribe];
}

/// A single policy step inside a flow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    /// Name of the policy plugin to execute.
    pub policy: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub configuration: Option<serde_json::Value>,
}

/// An ordered group of steps, enable-able as a whole.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Flow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub request: Vec<Step>,
    #[serde(default)]
    pub response: Vec<Step>,
    #[serde(default)]
    pub publish: Vec<Step>,
    #[serde(default)]
    pub subscribe: Vec<Step>,
}

impl Flow {
    pub fn steps(&self, leg: FlowLeg) -> &[Step] {
        match leg {
            FlowLeg::Request => &self.request,
            FlowLeg::Response => &self.response,
            FlowLeg::Publish => &self.publish,
            FlowLeg::Subscribe => &self.subscribe,
        }
    }

    /// The steps that actually execute for a leg: only enabled steps of an
    /// enabled flow count.
    pub fn active_steps(&self, leg: FlowLeg) -> impl Iterator<Item = &Step> {
        let steps: &[Step] = if self.enabled { self.steps(leg) } else { &[] };
        steps.iter().filter(|step| step.enabled)
    }
}
