//! Plans: the access policies an API exposes to consumers.

use serde::{Deserialize, Serialize};

use crate::definition::flow::Flow;

/// Authentication mechanism a plan is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanSecurityType {
    ApiKey,
    Jwt,
    Oauth2,
    KeyLess,
}

/// A named access policy: security type, selection rule and flows.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub security: PlanSecurityType,
    /// Plan-provided security configuration; substituted into the security
    /// policies of the plan when it handles a request.
    #[serde(default)]
    pub security_definition: Option<serde_json::Value>,
    /// Expression deciding whether this plan applies; empty means
    /// "applies whenever the mechanism matches".
    #[serde(default)]
    pub selection_rule: Option<String>,
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl Plan {
    /// The selection rule, if one is configured and non-empty.
    pub fn selection_rule(&self) -> Option<&str> {
        self.selection_rule.as_deref().filter(|rule| !rule.trim().is_empty())
    }

    /// A plan-configured custom claim name for client identification.
    pub fn client_id_claim(&self) -> Option<&str> {
        self.security_definition
            .as_ref()
            .and_then(|definition| definition.get("clientIdClaim"))
            .and_then(|claim| claim.as_str())
            .filter(|claim| !claim.is_empty())
    }
}
