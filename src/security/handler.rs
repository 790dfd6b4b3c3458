//! Plan-based authentication handlers.
//!
//! # Responsibilities
//! - Wrap a base authentication mechanism with a plan's selection rule and
//!   subscription pre-check
//! - Bind application/plan/subscription attributes on a successful match
//! - Substitute the plan's security definition into the security policies
//!
//! # Design Decisions
//! - `can_handle` = mechanism match AND selection rule AND pre-check
//! - A selection rule that fails to evaluate counts as a non-match and is
//!   never propagated
//! - Handlers are evaluated in a fixed order; keyless is the catch-all

use std::sync::Arc;

use crate::context::attributes::{
    ATTR_APPLICATION, ATTR_INTERNAL_API_KEY, ATTR_INTERNAL_JWT_CLAIMS, ATTR_INTERNAL_SECURITY_LAST_HANDLER,
    ATTR_INTERNAL_SUBSCRIPTION, ATTR_INTERNAL_TOKEN_IDENTIFIED, ATTR_PLAN, ATTR_SUBSCRIPTION,
};
use crate::context::{ExecutionContext, InternalValue, PhaseResult};
use crate::definition::{Plan, PlanSecurityType};
use crate::plugin::PluginRegistry;
use crate::security::jwt;
use crate::subscription::SubscriptionResolver;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_PARAM: &str = "api-key";
const BEARER_PREFIX: &str = "Bearer ";

/// A security policy reference with its effective configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityPolicy {
    pub name: String,
    pub configuration: Option<serde_json::Value>,
}

/// One plan wrapped around its base authentication mechanism.
pub struct PlanSecurityHandler {
    plan: Plan,
    api_id: String,
    resolver: Arc<dyn SubscriptionResolver>,
}

impl PlanSecurityHandler {
    pub fn new(plan: Plan, api_id: impl Into<String>, resolver: Arc<dyn SubscriptionResolver>) -> Self {
        Self {
            plan,
            api_id: api_id.into(),
            resolver,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Fixed evaluation order: API key, JWT, then the always-allow plans.
    pub fn order(&self) -> u8 {
        match self.plan.security {
            PlanSecurityType::ApiKey => 1,
            PlanSecurityType::Jwt => 2,
            PlanSecurityType::Oauth2 => 3,
            PlanSecurityType::KeyLess => 4,
        }
    }

    pub fn can_handle(&self, ctx: &mut ExecutionContext) -> bool {
        self.base_can_handle(ctx) && self.selection_rule_matches(ctx) && self.subscription_pre_check(ctx)
    }

    fn base_can_handle(&self, ctx: &mut ExecutionContext) -> bool {
        match self.plan.security {
            PlanSecurityType::ApiKey => {
                let Some(key) = extract_api_key(ctx) else {
                    return false;
                };
                ctx.internal_mut().put(ATTR_INTERNAL_TOKEN_IDENTIFIED, InternalValue::Flag(true));
                if let Some(api_key) = self.resolver.find_api_key(&self.api_id, &key) {
                    ctx.internal_mut().put(ATTR_INTERNAL_API_KEY, InternalValue::ApiKey(api_key));
                }
                true
            }
            PlanSecurityType::Jwt => {
                let Some(token) = extract_bearer_token(ctx) else {
                    return false;
                };
                ctx.internal_mut().put(ATTR_INTERNAL_TOKEN_IDENTIFIED, InternalValue::Flag(true));
                if let Some(claims) = jwt::decode_payload(&token) {
                    ctx.internal_mut().put(ATTR_INTERNAL_JWT_CLAIMS, InternalValue::Json(claims));
                }
                true
            }
            PlanSecurityType::Oauth2 | PlanSecurityType::KeyLess => true,
        }
    }

    fn selection_rule_matches(&self, ctx: &mut ExecutionContext) -> bool {
        let Some(rule) = self.plan.selection_rule() else {
            return true;
        };

        let matched = match ctx.eval_bool(rule) {
            Ok(matched) => matched,
            Err(error) => {
                tracing::debug!(
                    plan = %self.plan.id,
                    rule = %rule,
                    error = %error,
                    "Plan selection rule evaluation failed, treating as non-match"
                );
                false
            }
        };

        if !matched {
            // Downstream subscription checking must produce a normal
            // authorization error instead of silently falling through.
            ctx.internal_mut().put(ATTR_INTERNAL_TOKEN_IDENTIFIED, InternalValue::Flag(false));
            ctx.internal_mut().put(ATTR_INTERNAL_SECURITY_LAST_HANDLER, InternalValue::Flag(true));
        }
        matched
    }

    fn subscription_pre_check(&self, ctx: &mut ExecutionContext) -> bool {
        match self.plan.security {
            PlanSecurityType::ApiKey => match ctx.internal().get(ATTR_INTERNAL_API_KEY) {
                Some(InternalValue::ApiKey(api_key)) => api_key.plan == self.plan.id,
                _ => false,
            },
            // Actual subscription validation is deferred to a later policy.
            PlanSecurityType::Oauth2 | PlanSecurityType::KeyLess => true,
            PlanSecurityType::Jwt => self.jwt_pre_check(ctx),
        }
    }

    fn jwt_pre_check(&self, ctx: &mut ExecutionContext) -> bool {
        let claims = match ctx.internal().get(ATTR_INTERNAL_JWT_CLAIMS) {
            Some(InternalValue::Json(claims)) => claims.clone(),
            _ => return false,
        };

        let Some(client_id) = jwt::extract_client_id(&claims, self.plan.client_id_claim()) else {
            return false;
        };

        let Some(subscription) = self
            .resolver
            .find_active_subscription(&self.api_id, &self.plan.id, &client_id)
            .filter(|subscription| subscription.is_time_valid(ctx.request.timestamp))
        else {
            return false;
        };

        ctx.set_attribute(ATTR_APPLICATION, subscription.application.clone());
        ctx.set_attribute(ATTR_PLAN, self.plan.id.clone());
        ctx.set_attribute(ATTR_SUBSCRIPTION, subscription.id.clone());
        ctx.metrics.application = Some(subscription.application.clone());
        ctx.metrics.security_type = Some(PlanSecurityType::Jwt);
        ctx.metrics.security_token = extract_bearer_token(ctx);
        ctx.internal_mut()
            .put(ATTR_INTERNAL_SUBSCRIPTION, InternalValue::Subscription(subscription));
        true
    }

    /// Security policies to execute for this plan, with the plan's own
    /// security definition substituted for each policy's configuration.
    pub fn security_policies(&self) -> Vec<SecurityPolicy> {
        let names: &[&str] = match self.plan.security {
            PlanSecurityType::ApiKey => &["api-key"],
            PlanSecurityType::Jwt => &["jwt"],
            PlanSecurityType::Oauth2 => &["oauth2"],
            PlanSecurityType::KeyLess => &[],
        };
        names
            .iter()
            .map(|name| SecurityPolicy {
                name: name.to_string(),
                configuration: self.plan.security_definition.clone(),
            })
            .collect()
    }

    /// Run the selected plan: record metrics, bind the plan attribute and
    /// execute the plan's security policies.
    pub async fn handle(&self, ctx: &mut ExecutionContext, registry: &PluginRegistry) -> PhaseResult {
        ctx.set_attribute(ATTR_PLAN, self.plan.id.clone());
        ctx.metrics.plan = Some(self.plan.id.clone());
        ctx.metrics.security_type = Some(self.plan.security);

        match self.plan.security {
            PlanSecurityType::ApiKey => {
                ctx.metrics.security_token = extract_api_key(ctx);
                let application = match ctx.internal().get(ATTR_INTERNAL_API_KEY) {
                    Some(InternalValue::ApiKey(api_key)) => Some(api_key.application.clone()),
                    _ => None,
                };
                if let Some(application) = application {
                    ctx.set_attribute(ATTR_APPLICATION, application.clone());
                    ctx.metrics.application = Some(application);
                }
            }
            PlanSecurityType::Jwt => {
                ctx.metrics.security_token = extract_bearer_token(ctx);
            }
            PlanSecurityType::Oauth2 | PlanSecurityType::KeyLess => {}
        }

        for security_policy in self.security_policies() {
            if let Some(policy) = registry.policy(&security_policy.name) {
                policy.on_request(ctx).await?;
            }
        }
        Ok(())
    }
}

fn extract_api_key(ctx: &ExecutionContext) -> Option<String> {
    ctx.request
        .header(API_KEY_HEADER)
        .map(str::to_string)
        .or_else(|| ctx.request.params.get(API_KEY_PARAM).cloned())
        .filter(|key| !key.is_empty())
}

fn extract_bearer_token(ctx: &ExecutionContext) -> Option<String> {
    ctx.request
        .header(http::header::AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GatewayRequest;
    use crate::subscription::{Subscription, SubscriptionCache, SubscriptionStatus};
    use http::Method;
    use serde_json::json;

    fn jwt_plan(selection_rule: Option<&str>) -> Plan {
        Plan {
            id: "plan-jwt".into(),
            name: "jwt".into(),
            security: PlanSecurityType::Jwt,
            security_definition: None,
            selection_rule: selection_rule.map(str::to_string),
            flows: vec![],
        }
    }

    fn ctx_with_token(claims: serde_json::Value) -> ExecutionContext {
        let mut request = GatewayRequest::new(Method::GET, "/orders");
        let token = jwt::encode_unsigned(&claims);
        request
            .headers
            .insert(http::header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        ExecutionContext::new(request)
    }

    fn resolver_with(client_id: &str) -> Arc<SubscriptionCache> {
        let cache = SubscriptionCache::new();
        cache.put_subscription(Subscription {
            id: "sub-1".into(),
            api: "api-1".into(),
            plan: "plan-jwt".into(),
            application: "app-1".into(),
            client_id: Some(client_id.into()),
            status: SubscriptionStatus::Accepted,
            starting_at: None,
            ending_at: None,
        });
        Arc::new(cache)
    }

    #[test]
    fn jwt_pre_check_binds_subscription_attributes() {
        let handler = PlanSecurityHandler::new(jwt_plan(None), "api-1", resolver_with("client-a"));
        let mut ctx = ctx_with_token(json!({ "azp": "client-a" }));

        assert!(handler.can_handle(&mut ctx));
        assert_eq!(ctx.attribute_text(ATTR_APPLICATION).as_deref(), Some("app-1"));
        assert_eq!(ctx.attribute_text(ATTR_SUBSCRIPTION).as_deref(), Some("sub-1"));
    }

    #[test]
    fn jwt_without_subscription_does_not_match() {
        let handler = PlanSecurityHandler::new(jwt_plan(None), "api-1", resolver_with("someone-else"));
        let mut ctx = ctx_with_token(json!({ "azp": "client-a" }));
        assert!(!handler.can_handle(&mut ctx));
    }

    #[test]
    fn failed_selection_rule_clears_token_flag_and_marks_last_handler() {
        let handler = PlanSecurityHandler::new(
            jwt_plan(Some("{#request.headers['x-tier'] == 'gold'}")),
            "api-1",
            resolver_with("client-a"),
        );
        let mut ctx = ctx_with_token(json!({ "azp": "client-a" }));
        ctx.request.headers.insert("x-tier", "silver".parse().unwrap());

        assert!(!handler.can_handle(&mut ctx));
        assert!(!ctx.internal().flag(ATTR_INTERNAL_TOKEN_IDENTIFIED));
        assert!(ctx.internal().flag(ATTR_INTERNAL_SECURITY_LAST_HANDLER));
    }

    #[test]
    fn selection_rule_evaluation_error_is_a_non_match() {
        let handler = PlanSecurityHandler::new(
            jwt_plan(Some("{#request.headers['x-absent'] == 'x'}")),
            "api-1",
            resolver_with("client-a"),
        );
        let mut ctx = ctx_with_token(json!({ "azp": "client-a" }));
        assert!(!handler.can_handle(&mut ctx));
    }

    #[test]
    fn security_policies_carry_the_plan_definition() {
        let mut plan = jwt_plan(None);
        plan.security_definition = Some(json!({ "signature": "RSA_RS256" }));
        let handler = PlanSecurityHandler::new(plan, "api-1", resolver_with("client-a"));

        let policies = handler.security_policies();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name, "jwt");
        assert_eq!(policies[0].configuration, Some(json!({ "signature": "RSA_RS256" })));
    }
}
