//! Endpoint invoker behavior, driven end to end through the reactor.

mod common;

use api_gateway::context::attributes::{ATTR_REQUEST_ENDPOINT, ATTR_REQUEST_METHOD};
use api_gateway::context::AttributeValue;
use api_gateway::definition::HttpMethod;
use http::{Method, StatusCode};

fn body_json(ctx: &api_gateway::ExecutionContext) -> serde_json::Value {
    serde_json::from_slice(&ctx.response.body).unwrap()
}

#[tokio::test]
async fn null_override_uses_the_load_balancer_default() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(&ctx.response.body[..], b"mock message");
    assert!(ctx.attribute(ATTR_REQUEST_ENDPOINT).is_none());
}

#[tokio::test]
async fn name_with_empty_remainder_selects_the_named_endpoint() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_ENDPOINT, "primary:");
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(ctx.attribute_text(ATTR_REQUEST_ENDPOINT).as_deref(), Some(""));
}

#[tokio::test]
async fn only_the_first_colon_splits_the_reference() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_ENDPOINT, "primary:with:colon:");
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(ctx.attribute_text(ATTR_REQUEST_ENDPOINT).as_deref(), Some("with:colon:"));
}

#[tokio::test]
async fn url_form_is_never_name_split() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_ENDPOINT, "http://upstream:9999/orders");
    reactor.handle(&mut ctx).await;

    // Still resolved through the default group; the attribute keeps the
    // whole literal target.
    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(
        ctx.attribute_text(ATTR_REQUEST_ENDPOINT).as_deref(),
        Some("http://upstream:9999/orders")
    );
}

#[tokio::test]
async fn unknown_endpoint_name_fails_with_not_found() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_ENDPOINT, "missing:");
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::NOT_FOUND);
    assert_eq!(body_json(&ctx)["key"], "NO_ENDPOINT_FOUND");
}

#[tokio::test]
async fn empty_pool_fails_with_not_found() {
    let mut api = common::message_api(Some("auto"));
    api.endpoint_groups.clear();
    let reactor = common::deployed_reactor(api);

    let mut ctx = common::test_context();
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::NOT_FOUND);
    assert_eq!(body_json(&ctx)["key"], "NO_ENDPOINT_FOUND");
}

// --- QoS negotiation ---

#[tokio::test]
async fn matching_qos_connects() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(ctx.response.headers.get("x-endpoint-connector").unwrap(), "mock");
}

#[tokio::test]
async fn unsupported_qos_level_is_incompatible() {
    // The mock endpoint declares none/auto; at-least-once cannot match.
    let reactor = common::deployed_reactor(common::message_api(Some("at-least-once")));

    let mut ctx = common::test_context();
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&ctx)["key"], "INCOMPATIBLE_QOS");
}

#[tokio::test]
async fn undeclared_requirement_is_a_configuration_defect() {
    // Entrypoint without any QoS declaration against a declaring endpoint.
    let reactor = common::deployed_reactor(common::message_api(None));

    let mut ctx = common::test_context();
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(&ctx)["key"], "INVALID_QOS_CONFIGURATION");
}

// --- HTTP method override (sync connectors) ---

#[tokio::test]
async fn gateway_method_enum_overrides() {
    let backend = common::start_mock_backend("hello").await;
    let reactor = common::deployed_reactor(common::proxy_api(&format!("http://{backend}")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_METHOD, AttributeValue::Method(HttpMethod::POST));
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(ctx.request.method, Method::POST);
    assert_eq!(&ctx.response.body[..], b"hello");
}

#[tokio::test]
async fn transport_method_enum_overrides() {
    let backend = common::start_mock_backend("hello").await;
    let reactor = common::deployed_reactor(common::proxy_api(&format!("http://{backend}")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_METHOD, AttributeValue::TransportMethod(Method::PUT));
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.request.method, Method::PUT);
}

#[tokio::test]
async fn exact_method_name_string_overrides() {
    let backend = common::start_mock_backend("hello").await;
    let reactor = common::deployed_reactor(common::proxy_api(&format!("http://{backend}")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_METHOD, "DELETE");
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.request.method, Method::DELETE);
}

#[tokio::test]
async fn lowercase_method_name_is_invalid() {
    let backend = common::start_mock_backend("hello").await;
    let reactor = common::deployed_reactor(common::proxy_api(&format!("http://{backend}")));

    let mut ctx = common::test_context();
    ctx.set_attribute(ATTR_REQUEST_METHOD, "delete");
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::BAD_REQUEST);
    assert_eq!(body_json(&ctx)["key"], "INVALID_HTTP_METHOD");
    assert_eq!(ctx.request.method, Method::GET, "method must not be overridden");
}

#[tokio::test]
async fn non_method_attribute_is_invalid() {
    let backend = common::start_mock_backend("hello").await;
    let reactor = common::deployed_reactor(common::proxy_api(&format!("http://{backend}")));

    let mut ctx = common::test_context();
    ctx.set_attribute(
        ATTR_REQUEST_METHOD,
        AttributeValue::List(vec![AttributeValue::Text("GET".to_string())]),
    );
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(&ctx)["message"],
        "Http method can not be overridden because ATTR_REQUEST_METHOD attribute is invalid"
    );
}

#[tokio::test]
async fn absent_method_attribute_keeps_the_request_method() {
    let backend = common::start_mock_backend("hello").await;
    let reactor = common::deployed_reactor(common::proxy_api(&format!("http://{backend}")));

    let mut ctx = common::test_context();
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(ctx.request.method, Method::GET);
}

// --- Endpoint templates ---

#[tokio::test]
async fn template_expression_resolves_the_endpoint_name() {
    let reactor = common::deployed_reactor(common::message_api(Some("auto")));

    let mut ctx = common::test_context();
    ctx.set_attribute("endpoint-name", "primary");
    ctx.set_attribute(ATTR_REQUEST_ENDPOINT, "{#context.attributes['endpoint-name']}:");
    reactor.handle(&mut ctx).await;

    assert_eq!(ctx.response.status, StatusCode::OK);
    assert_eq!(ctx.attribute_text(ATTR_REQUEST_ENDPOINT).as_deref(), Some(""));
}
