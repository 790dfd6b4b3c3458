//! Shared builders for the integration suites.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::Method;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use api_gateway::connector::{EndpointConnector, MessageMockConnector, Qos, QosCapability};
use api_gateway::context::{ExecutionContext, GatewayRequest, Interruption, PhaseResult};
use api_gateway::definition::{Api, Flow, LoadBalancerType, Plan, PlanSecurityType, Step};
use api_gateway::endpoint::pool::EndpointGroup;
use api_gateway::endpoint::{EndpointPool, Invoker, ManagedEndpoint};
use api_gateway::lifecycle::NodeState;
use api_gateway::plugin::{PluginRegistry, Policy};
use api_gateway::reactor::processor::{Processor, ProcessorChain};
use api_gateway::reactor::{ApiReactor, ReactorComponents, ReactorOptions};
use api_gateway::subscription::{ApiKey, Subscription, SubscriptionCache, SubscriptionStatus};

/// Shared journal the recording doubles append to.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub fn count(journal: &Journal, entry: &str) -> usize {
    journal.lock().unwrap().iter().filter(|recorded| *recorded == entry).count()
}

/// Policy double that records its executions.
pub struct RecordingPolicy {
    name: String,
    journal: Journal,
}

impl RecordingPolicy {
    pub fn new(name: &str, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal,
        })
    }
}

#[async_trait]
impl Policy for RecordingPolicy {
    fn id(&self) -> &str {
        &self.name
    }

    async fn on_request(&self, _ctx: &mut ExecutionContext) -> PhaseResult {
        self.journal.lock().unwrap().push(format!("{}:request", self.name));
        Ok(())
    }

    async fn on_response(&self, _ctx: &mut ExecutionContext) -> PhaseResult {
        self.journal.lock().unwrap().push(format!("{}:response", self.name));
        Ok(())
    }
}

/// Processor double that records its executions.
pub struct RecordingProcessor {
    name: String,
    journal: Journal,
}

#[async_trait]
impl Processor for RecordingProcessor {
    fn id(&self) -> &str {
        &self.name
    }

    async fn process(&self, _ctx: &mut ExecutionContext) -> PhaseResult {
        self.journal.lock().unwrap().push(self.name.clone());
        Ok(())
    }
}

pub fn recording_chain(name: &str, journal: &Journal) -> ProcessorChain {
    ProcessorChain::new(
        name,
        vec![Arc::new(RecordingProcessor {
            name: name.to_string(),
            journal: journal.clone(),
        })],
    )
}

/// Outcome a mock invoker produces.
#[derive(Clone)]
pub enum InvokerOutcome {
    Success,
    Interrupt,
    Failure(u16, &'static str),
    Technical,
    /// Never completes on its own; used to exercise the request timeout.
    Hang,
}

/// Invoker double with a scripted outcome.
pub struct MockInvoker {
    outcome: InvokerOutcome,
    journal: Journal,
}

impl MockInvoker {
    pub fn new(outcome: InvokerOutcome, journal: Journal) -> Arc<Self> {
        Arc::new(Self { outcome, journal })
    }
}

#[async_trait]
impl Invoker for MockInvoker {
    fn id(&self) -> &str {
        "mock-invoker"
    }

    async fn invoke(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        self.journal.lock().unwrap().push("invoker".to_string());
        match &self.outcome {
            InvokerOutcome::Success => Ok(()),
            InvokerOutcome::Interrupt => Err(ctx.interrupt()),
            InvokerOutcome::Failure(status, key) => Err(ctx.interrupt_with(
                api_gateway::context::ExecutionFailure::new(*status, *key, "scripted failure"),
            )),
            InvokerOutcome::Technical => Err(Interruption::Technical("scripted error".to_string())),
            InvokerOutcome::Hang => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                Ok(())
            }
        }
    }
}

/// A minimal API with one HTTP listener and a keyless plan.
pub fn keyless_api() -> Api {
    let mut api: Api = serde_json::from_str(r#"{"id": "api-1", "name": "Orders"}"#).unwrap();
    api.listeners =
        serde_json::from_str(r#"[{"type": "http", "paths": ["/orders"], "entrypoints": [{"type": "http-proxy"}]}]"#)
            .unwrap();
    api.plans = vec![keyless_plan("plan-keyless")];
    api
}

pub fn keyless_plan(id: &str) -> Plan {
    Plan {
        id: id.to_string(),
        name: id.to_string(),
        security: PlanSecurityType::KeyLess,
        security_definition: None,
        selection_rule: None,
        flows: vec![],
    }
}

pub fn step(policy: &str) -> Step {
    Step {
        name: None,
        policy: policy.to_string(),
        enabled: true,
        condition: None,
        configuration: None,
    }
}

pub fn flow(request_policies: &[&str], response_policies: &[&str]) -> Flow {
    Flow {
        name: None,
        enabled: true,
        request: request_policies.iter().map(|policy| step(policy)).collect(),
        response: response_policies.iter().map(|policy| step(policy)).collect(),
        publish: vec![],
        subscribe: vec![],
    }
}

pub fn test_context() -> ExecutionContext {
    ExecutionContext::new(GatewayRequest::new(Method::GET, "/orders"))
}

/// Pool with a single started group of message endpoints.
pub fn message_pool(endpoints: Vec<Arc<ManagedEndpoint>>) -> Arc<EndpointPool> {
    let pool = EndpointPool::new();
    pool.replace(vec![EndpointGroup::new("default", LoadBalancerType::RoundRobin, endpoints)]);
    pool.start();
    Arc::new(pool)
}

pub fn message_endpoint(name: &str) -> Arc<ManagedEndpoint> {
    Arc::new(ManagedEndpoint::new(
        name,
        "default",
        EndpointConnector::Message(MessageMockConnector::new()),
    ))
}

pub fn message_endpoint_with_qos(
    name: &str,
    qos: Option<HashSet<Qos>>,
    capabilities: Option<HashSet<QosCapability>>,
) -> Arc<ManagedEndpoint> {
    Arc::new(ManagedEndpoint::new(
        name,
        "default",
        EndpointConnector::Message(
            MessageMockConnector::new()
                .with_supported_qos(qos)
                .with_supported_qos_capabilities(capabilities),
        ),
    ))
}

/// Assemble a reactor over recording chains and a scripted invoker.
pub struct ReactorFixture {
    pub reactor: ApiReactor,
    pub journal: Journal,
    pub node: Arc<NodeState>,
}

pub fn reactor_fixture(api: Api, outcome: InvokerOutcome, options: ReactorOptions) -> ReactorFixture {
    let journal = journal();
    let node = Arc::new(NodeState::new());
    node.set_started(true);

    let mut registry = PluginRegistry::new();
    registry.register_policy(RecordingPolicy::new("platform-policy", journal.clone()));
    registry.register_policy(RecordingPolicy::new("plan-policy", journal.clone()));
    registry.register_policy(RecordingPolicy::new("api-policy", journal.clone()));

    let mut api = api;
    api.flows = vec![flow(&["api-policy"], &["api-policy"])];
    if let Some(plan) = api.plans.first_mut() {
        plan.flows = vec![flow(&["plan-policy"], &["plan-policy"])];
    }

    let reactor = ApiReactor::new(
        Arc::new(api),
        ReactorComponents {
            registry: Arc::new(registry),
            subscriptions: Arc::new(SubscriptionCache::new()),
            endpoint_pool: message_pool(vec![message_endpoint("primary")]),
            platform_flows: vec![flow(&["platform-policy"], &["platform-policy"])],
            node: node.clone(),
            options,
            default_invoker: Some(MockInvoker::new(outcome, journal.clone())),
            pre_processors: Some(recording_chain("pre-processors", &journal)),
            post_processors: Some(recording_chain("post-processors", &journal)),
            error_processors: Some(recording_chain("error-processors", &journal)),
        },
    );

    ReactorFixture { reactor, journal, node }
}

/// A message API with one async entrypoint and a mock endpoint group.
pub fn message_api(qos: Option<&str>) -> Api {
    let qos_field = qos.map(|label| format!(r#", "qos": "{label}""#)).unwrap_or_default();
    let raw = format!(
        r#"{{
            "id": "api-1",
            "name": "Events",
            "type": "message",
            "listeners": [{{"type": "subscription", "entrypoints": [{{"type": "http-get"{qos_field}}}]}}],
            "endpoint_groups": [{{"name": "default", "endpoints": [{{"name": "primary", "type": "mock"}}]}}]
        }}"#
    );
    let mut api: Api = serde_json::from_str(&raw).unwrap();
    api.plans = vec![keyless_plan("plan-keyless")];
    api
}

/// A proxy API forwarding to the given backend target.
pub fn proxy_api(target: &str) -> Api {
    let raw = format!(
        r#"{{
            "id": "api-1",
            "name": "Orders",
            "type": "proxy",
            "listeners": [{{"type": "http", "paths": ["/orders"], "entrypoints": [{{"type": "http-proxy"}}]}}],
            "endpoint_groups": [{{"name": "default", "endpoints": [
                {{"name": "primary", "type": "http-proxy", "configuration": {{"target": "{target}"}}}}
            ]}}]
        }}"#
    );
    let mut api: Api = serde_json::from_str(&raw).unwrap();
    api.plans = vec![keyless_plan("plan-keyless")];
    api
}

/// Build and start a reactor over the API's own endpoint groups, with the
/// default invoker and processor chains.
pub fn deployed_reactor(api: Api) -> ApiReactor {
    let node = Arc::new(NodeState::new());
    node.set_started(true);
    let pool = Arc::new(EndpointPool::from_definition(&api));
    let reactor = ApiReactor::new(
        Arc::new(api),
        ReactorComponents {
            registry: Arc::new(PluginRegistry::new()),
            subscriptions: Arc::new(SubscriptionCache::new()),
            endpoint_pool: pool,
            platform_flows: vec![],
            node,
            options: ReactorOptions::default(),
            default_invoker: None,
            pre_processors: None,
            post_processors: None,
            error_processors: None,
        },
    );
    reactor.start();
    reactor
}

pub fn subscription(api: &str, plan: &str, client_id: &str) -> Subscription {
    Subscription {
        id: format!("sub-{plan}-{client_id}"),
        api: api.to_string(),
        plan: plan.to_string(),
        application: "app-1".to_string(),
        client_id: Some(client_id.to_string()),
        status: SubscriptionStatus::Accepted,
        starting_at: None,
        ending_at: None,
    }
}

pub fn api_key(api: &str, plan: &str, key: &str) -> ApiKey {
    ApiKey {
        key: key.to_string(),
        api: api.to_string(),
        plan: plan.to_string(),
        application: "app-1".to_string(),
        active: true,
        expire_at: None,
    }
}

/// Start a simple mock HTTP backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buffer = [0u8; 4096];
                        use tokio::io::AsyncReadExt;
                        let _ = socket.read(&mut buffer).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a TCP echo backend.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let (mut read_half, mut write_half) = socket.split();
                        let _ = tokio::io::copy(&mut read_half, &mut write_half).await;
                        let _ = write_half.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
