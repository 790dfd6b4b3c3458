//! Plan security chain composition and selection.

mod common;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use api_gateway::context::attributes::{ATTR_APPLICATION, ATTR_PLAN};
use api_gateway::context::{ExecutionContext, GatewayRequest, Interruption};
use api_gateway::definition::{Plan, PlanSecurityType};
use api_gateway::plugin::PluginRegistry;
use api_gateway::security::{jwt, SecurityChain, API_KEY_HEADER, PLAN_UNRESOLVABLE_KEY};
use api_gateway::subscription::SubscriptionCache;
use http::Method;
use serde_json::json;

fn plan(id: &str, security: PlanSecurityType) -> Plan {
    Plan {
        id: id.to_string(),
        name: id.to_string(),
        security,
        security_definition: None,
        selection_rule: None,
        flows: vec![],
    }
}

fn chain_for(plans: Vec<Plan>, cache: Arc<SubscriptionCache>) -> SecurityChain {
    let mut api = common::keyless_api();
    api.plans = plans;
    SecurityChain::new(&api, Arc::new(PluginRegistry::new()), cache)
}

fn ctx_with_bearer(claims: serde_json::Value) -> ExecutionContext {
    let mut request = GatewayRequest::new(Method::GET, "/orders");
    let token = jwt::encode_unsigned(&claims);
    request
        .headers
        .insert(http::header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    ExecutionContext::new(request)
}

#[tokio::test]
async fn jwt_client_id_resolution_prefers_aud_over_client_id() {
    let cache = Arc::new(SubscriptionCache::new());
    cache.put_subscription(common::subscription("api-1", "plan-jwt", "a"));
    let chain = chain_for(vec![plan("plan-jwt", PlanSecurityType::Jwt)], cache);

    let mut ctx = ctx_with_bearer(json!({ "azp": null, "aud": ["a", "b"], "client_id": "c" }));
    chain.execute(&mut ctx).await.unwrap();

    assert_eq!(ctx.metrics.security_type, Some(PlanSecurityType::Jwt));
    assert_eq!(ctx.attribute_text(ATTR_PLAN).as_deref(), Some("plan-jwt"));
    assert_eq!(ctx.attribute_text(ATTR_APPLICATION).as_deref(), Some("app-1"));
    assert!(ctx.metrics.security_token.is_some());
}

#[tokio::test]
async fn jwt_custom_claim_takes_priority() {
    let cache = Arc::new(SubscriptionCache::new());
    cache.put_subscription(common::subscription("api-1", "plan-jwt", "custom-client"));
    let mut jwt_plan = plan("plan-jwt", PlanSecurityType::Jwt);
    jwt_plan.security_definition = Some(json!({ "clientIdClaim": "cid" }));
    let chain = chain_for(vec![jwt_plan], cache);

    let mut ctx = ctx_with_bearer(json!({ "cid": "custom-client", "azp": "other" }));
    chain.execute(&mut ctx).await.unwrap();

    assert_eq!(ctx.metrics.security_type, Some(PlanSecurityType::Jwt));
}

#[tokio::test]
async fn expired_subscription_does_not_match() {
    let cache = Arc::new(SubscriptionCache::new());
    let mut subscription = common::subscription("api-1", "plan-jwt", "a");
    subscription.ending_at = Some(SystemTime::now() - Duration::from_secs(60));
    cache.put_subscription(subscription);
    let chain = chain_for(vec![plan("plan-jwt", PlanSecurityType::Jwt)], cache);

    let mut ctx = ctx_with_bearer(json!({ "azp": "a" }));
    let error = chain.execute(&mut ctx).await.unwrap_err();

    match error {
        Interruption::Failure(failure) => {
            assert_eq!(failure.status_code, 401);
            assert_eq!(failure.key, PLAN_UNRESOLVABLE_KEY);
            assert_eq!(failure.message, "Unauthorized");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_selection_rule_falls_through_to_keyless() {
    let cache = Arc::new(SubscriptionCache::new());
    cache.put_subscription(common::subscription("api-1", "plan-jwt", "a"));
    let mut jwt_plan = plan("plan-jwt", PlanSecurityType::Jwt);
    jwt_plan.selection_rule = Some("{#request.headers['x-tier'] == 'gold'}".to_string());
    let chain = chain_for(vec![common::keyless_plan("plan-keyless"), jwt_plan], cache);

    let mut ctx = ctx_with_bearer(json!({ "azp": "a" }));
    ctx.request.headers.insert("x-tier", "silver".parse().unwrap());
    chain.execute(&mut ctx).await.unwrap();

    assert_eq!(ctx.metrics.security_type, Some(PlanSecurityType::KeyLess));
    assert_eq!(ctx.attribute_text(ATTR_PLAN).as_deref(), Some("plan-keyless"));
}

#[tokio::test]
async fn matching_selection_rule_keeps_the_jwt_plan() {
    let cache = Arc::new(SubscriptionCache::new());
    cache.put_subscription(common::subscription("api-1", "plan-jwt", "a"));
    let mut jwt_plan = plan("plan-jwt", PlanSecurityType::Jwt);
    jwt_plan.selection_rule = Some("{#request.headers['x-tier'] == 'gold'}".to_string());
    let chain = chain_for(vec![common::keyless_plan("plan-keyless"), jwt_plan], cache);

    let mut ctx = ctx_with_bearer(json!({ "azp": "a" }));
    ctx.request.headers.insert("x-tier", "gold".parse().unwrap());
    chain.execute(&mut ctx).await.unwrap();

    // JWT is evaluated before keyless regardless of declaration order.
    assert_eq!(ctx.metrics.security_type, Some(PlanSecurityType::Jwt));
}

#[tokio::test]
async fn api_key_plan_matches_only_its_own_keys() {
    let cache = Arc::new(SubscriptionCache::new());
    cache.put_api_key(common::api_key("api-1", "plan-apikey", "valid-key"));
    let chain = chain_for(
        vec![common::keyless_plan("plan-keyless"), plan("plan-apikey", PlanSecurityType::ApiKey)],
        cache,
    );

    let mut request = GatewayRequest::new(Method::GET, "/orders");
    request.headers.insert(API_KEY_HEADER, "valid-key".parse().unwrap());
    let mut ctx = ExecutionContext::new(request);
    chain.execute(&mut ctx).await.unwrap();

    assert_eq!(ctx.metrics.security_type, Some(PlanSecurityType::ApiKey));
    assert_eq!(ctx.attribute_text(ATTR_PLAN).as_deref(), Some("plan-apikey"));
    assert_eq!(ctx.attribute_text(ATTR_APPLICATION).as_deref(), Some("app-1"));
    assert_eq!(ctx.metrics.security_token.as_deref(), Some("valid-key"));
}

#[tokio::test]
async fn key_bound_to_another_plan_falls_through() {
    let cache = Arc::new(SubscriptionCache::new());
    cache.put_api_key(common::api_key("api-1", "some-other-plan", "valid-key"));
    let chain = chain_for(
        vec![plan("plan-apikey", PlanSecurityType::ApiKey), common::keyless_plan("plan-keyless")],
        cache,
    );

    let mut request = GatewayRequest::new(Method::GET, "/orders");
    request.headers.insert(API_KEY_HEADER, "valid-key".parse().unwrap());
    let mut ctx = ExecutionContext::new(request);
    chain.execute(&mut ctx).await.unwrap();

    assert_eq!(ctx.metrics.security_type, Some(PlanSecurityType::KeyLess));
}

#[tokio::test]
async fn no_matching_plan_is_a_controlled_unauthorized() {
    let chain = chain_for(vec![plan("plan-jwt", PlanSecurityType::Jwt)], Arc::new(SubscriptionCache::new()));

    // No bearer token at all.
    let mut ctx = ExecutionContext::new(GatewayRequest::new(Method::GET, "/orders"));
    let error = chain.execute(&mut ctx).await.unwrap_err();

    match error {
        Interruption::Failure(failure) => {
            assert_eq!(failure.status_code, 401);
            assert_eq!(failure.key, PLAN_UNRESOLVABLE_KEY);
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
