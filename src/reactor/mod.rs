//! Request execution reactor.
//!
//! # Responsibilities
//! - Sequence platform/plan/API flows, processor chains and the invoker
//! - Route the response path according to the interruption taxonomy
//! - Manage the reactor lifecycle and cascade it to its components
//!
//! # Data Flow
//! ```text
//! REQUEST : platform flow → pre-processors → security chain
//!           → plan flow → api flow → invoker
//! RESPONSE: plan flow → api flow → post-processors → platform flow
//!
//! benign interruption : post-processors + platform flow only
//! failure / error     : error processors only
//! ```
//!
//! # Design Decisions
//! - One catch point decides which RESPONSE-leg chain runs; there is no
//!   separate cancellation path (timeouts inject the same signals)
//! - Hooks are installed at start time; zero hooks when tracing is off
//! - Pending requests are counted so stop() can drain before cascading

pub mod flow;
pub mod hook;
pub mod processor;

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use http::StatusCode;

use crate::connector::{entrypoint_connector_for, EntrypointConnector};
use crate::context::attributes::{
    ATTR_API, ATTR_CONTEXT_PATH, ATTR_INTERNAL_ENTRYPOINT_CONNECTOR, ATTR_INTERNAL_INVOKER,
    ATTR_INTERNAL_INVOKER_SKIP,
};
use crate::context::{ExecutionContext, ExecutionFailure, InternalValue, Interruption, PhaseResult};
use crate::definition::{Api, Flow};
use crate::endpoint::invoker::{EndpointInvoker, Invoker};
use crate::endpoint::pool::EndpointPool;
use crate::lifecycle::NodeState;
use crate::observability::metrics;
use crate::plugin::PluginRegistry;
use crate::security::SecurityChain;
use crate::subscription::SubscriptionResolver;

use self::flow::{FlowChain, PlanFlowChain};
use self::hook::{hooked, ChainHook, TracingHook};
use self::processor::{ProcessorChain, ProcessorChainFactory};

pub const REQUEST_TIMEOUT_KEY: &str = "REQUEST_TIMEOUT";
pub const NO_ENTRYPOINT_FOUND_KEY: &str = "NO_ENTRYPOINT_FOUND";

/// Execution leg of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Request,
    Response,
}

/// Reactor lifecycle states.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created = 0,
    Started = 1,
    Stopping = 2,
    Stopped = 3,
}

impl From<u8> for LifecycleState {
    fn from(value: u8) -> Self {
        match value {
            1 => LifecycleState::Started,
            2 => LifecycleState::Stopping,
            3 => LifecycleState::Stopped,
            _ => LifecycleState::Created,
        }
    }
}

/// Tunable reactor behavior.
#[derive(Debug, Clone)]
pub struct ReactorOptions {
    /// Hook installation switch.
    pub tracing_enabled: bool,
    /// Total request timeout; zero or less means infinite.
    pub request_timeout: Duration,
    /// Minimum remaining window granted to a request that already consumed
    /// most of its timeout.
    pub request_timeout_grace: Duration,
    /// How long stop() waits for in-flight requests.
    pub pending_requests_timeout: Duration,
}

impl Default for ReactorOptions {
    fn default() -> Self {
        Self {
            tracing_enabled: false,
            request_timeout: Duration::ZERO,
            request_timeout_grace: Duration::from_millis(30),
            pending_requests_timeout: Duration::from_secs(10),
        }
    }
}

/// Exactly-once lifecycle wrapper around the policy registry.
pub struct PolicyManager {
    registry: Arc<PluginRegistry>,
    started: AtomicBool,
}

impl PolicyManager {
    fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            started: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("policy manager started");
        }
    }

    fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            tracing::debug!("policy manager stopped");
        }
    }
}

/// Exactly-once lifecycle for the API's deployed resources.
pub struct ResourceManager {
    resource_count: usize,
    started: AtomicBool,
}

impl ResourceManager {
    fn new(api: &Api) -> Self {
        Self {
            resource_count: api.resources.iter().filter(|resource| resource.enabled).count(),
            started: AtomicBool::new(false),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn start(&self) {
        if !self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(resources = self.resource_count, "resources started");
        }
    }

    fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            tracing::debug!("resources stopped");
        }
    }
}

/// Collaborators injected into a reactor.
pub struct ReactorComponents {
    pub registry: Arc<PluginRegistry>,
    pub subscriptions: Arc<dyn SubscriptionResolver>,
    pub endpoint_pool: Arc<EndpointPool>,
    pub platform_flows: Vec<Flow>,
    pub node: Arc<NodeState>,
    pub options: ReactorOptions,
    /// Override for the default invoker; the endpoint invoker otherwise.
    pub default_invoker: Option<Arc<dyn Invoker>>,
    pub pre_processors: Option<ProcessorChain>,
    pub post_processors: Option<ProcessorChain>,
    pub error_processors: Option<ProcessorChain>,
}

/// Built once the reactor starts.
struct ReactorRuntime {
    security_chain: SecurityChain,
    processor_chain_hooks: Vec<Arc<dyn ChainHook>>,
    invoker_hooks: Vec<Arc<dyn ChainHook>>,
}

/// The per-API request execution state machine.
pub struct ApiReactor {
    api: Arc<Api>,
    options: ReactorOptions,
    node: Arc<NodeState>,

    platform_flow_chain: FlowChain,
    plan_flow_chain: PlanFlowChain,
    api_flow_chain: FlowChain,
    pre_processors: ProcessorChain,
    post_processors: ProcessorChain,
    error_processors: ProcessorChain,

    registry: Arc<PluginRegistry>,
    subscriptions: Arc<dyn SubscriptionResolver>,
    endpoint_pool: Arc<EndpointPool>,
    default_invoker: Arc<dyn Invoker>,
    entrypoints: Vec<Arc<EntrypointConnector>>,

    policy_manager: PolicyManager,
    resource_manager: ResourceManager,

    runtime: OnceLock<ReactorRuntime>,
    state: AtomicU8,
    pending_requests: AtomicUsize,
}

impl ApiReactor {
    pub fn new(api: Arc<Api>, components: ReactorComponents) -> Self {
        let registry = components.registry;
        let platform_flow_chain = FlowChain::new("platform", &components.platform_flows, &registry);
        let plan_flow_chain = PlanFlowChain::new("plan", &api.plans, &registry);
        let api_flow_chain = FlowChain::new("api", &api.flows, &registry);

        let default_invoker: Arc<dyn Invoker> = components
            .default_invoker
            .unwrap_or_else(|| Arc::new(EndpointInvoker::new(components.endpoint_pool.clone())));

        let entrypoints: Vec<Arc<EntrypointConnector>> = api
            .listeners
            .iter()
            .flat_map(|listener| listener.entrypoints.iter())
            .filter_map(|entrypoint| entrypoint_connector_for(&entrypoint.entrypoint_type, entrypoint.qos.as_deref()))
            .filter(|connector| connector.supported_api() == api.api_type)
            .map(Arc::new)
            .collect();

        Self {
            policy_manager: PolicyManager::new(registry.clone()),
            resource_manager: ResourceManager::new(&api),
            options: components.options,
            node: components.node,
            platform_flow_chain,
            plan_flow_chain,
            api_flow_chain,
            pre_processors: components.pre_processors.unwrap_or_else(ProcessorChainFactory::pre_processors),
            post_processors: components.post_processors.unwrap_or_else(ProcessorChainFactory::post_processors),
            error_processors: components.error_processors.unwrap_or_else(ProcessorChainFactory::error_processors),
            registry,
            subscriptions: components.subscriptions,
            endpoint_pool: components.endpoint_pool,
            default_invoker,
            entrypoints,
            runtime: OnceLock::new(),
            state: AtomicU8::new(LifecycleState::Created as u8),
            pending_requests: AtomicUsize::new(0),
            api,
        }
    }

    pub fn api(&self) -> &Arc<Api> {
        &self.api
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.state.load(Ordering::SeqCst).into()
    }

    pub fn pending_requests(&self) -> usize {
        self.pending_requests.load(Ordering::SeqCst)
    }

    pub fn policy_manager(&self) -> &PolicyManager {
        &self.policy_manager
    }

    pub fn resource_manager(&self) -> &ResourceManager {
        &self.resource_manager
    }

    pub fn processor_chain_hook_count(&self) -> usize {
        self.runtime.get().map(|runtime| runtime.processor_chain_hooks.len()).unwrap_or(0)
    }

    pub fn invoker_hook_count(&self) -> usize {
        self.runtime.get().map(|runtime| runtime.invoker_hooks.len()).unwrap_or(0)
    }

    pub fn security_chain_hook_count(&self) -> usize {
        self.runtime.get().map(|runtime| runtime.security_chain.hook_count()).unwrap_or(0)
    }

    /// Start the reactor and cascade to its components, exactly once.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(
                LifecycleState::Created as u8,
                LifecycleState::Started as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        let started_at = Instant::now();
        self.resource_manager.start();
        self.policy_manager.start();
        self.endpoint_pool.start();

        // The security chain needs started policies.
        let mut security_chain = SecurityChain::new(&self.api, self.registry.clone(), self.subscriptions.clone());
        let mut processor_chain_hooks: Vec<Arc<dyn ChainHook>> = Vec::new();
        let mut invoker_hooks: Vec<Arc<dyn ChainHook>> = Vec::new();
        if self.options.tracing_enabled {
            processor_chain_hooks.push(Arc::new(TracingHook::new("processor-chain")));
            invoker_hooks.push(Arc::new(TracingHook::new("invoker")));
            security_chain.add_hook(Arc::new(TracingHook::new("security-plan")));
        }
        let _ = self.runtime.set(ReactorRuntime {
            security_chain,
            processor_chain_hooks,
            invoker_hooks,
        });

        tracing::info!(
            api_id = %self.api.id,
            api_name = %self.api.name,
            startup_ms = started_at.elapsed().as_millis() as u64,
            "API reactor started"
        );
    }

    /// Stop the reactor. Idempotent; a no-op unless the reactor actually
    /// reached the started state. When the node is running, in-flight
    /// requests are drained first, bounded by the configured timeout.
    pub async fn stop(&self) {
        if self
            .state
            .compare_exchange(
                LifecycleState::Started as u8,
                LifecycleState::Stopping as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        if self.node.is_started() {
            tracing::debug!(api_id = %self.api.id, "waiting for pending requests before stopping");
            let deadline = Instant::now() + self.options.pending_requests_timeout;
            while self.pending_requests() > 0 && Instant::now() < deadline {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }

        self.endpoint_pool.stop();
        self.policy_manager.stop();
        self.resource_manager.stop();
        self.state.store(LifecycleState::Stopped as u8, Ordering::SeqCst);
        tracing::info!(api_id = %self.api.id, "API reactor stopped");
    }

    /// Handle one request end to end. The response is always ended when this
    /// returns, whatever chain produced it.
    pub async fn handle(&self, ctx: &mut ExecutionContext) {
        let started_at = Instant::now();

        let Some(runtime) = self.runtime.get().filter(|_| self.lifecycle_state() == LifecycleState::Started) else {
            ctx.response.status = StatusCode::SERVICE_UNAVAILABLE;
            ctx.response.end();
            return;
        };

        self.prepare_context(ctx);
        self.pending_requests.fetch_add(1, Ordering::SeqCst);

        let result = self.run_with_timeout(ctx, runtime).await;
        match result {
            Ok(()) => {}
            Err(Interruption::Interrupted) => {
                // Benign: tracing/metrics finalization still runs.
                self.finalize_benign(ctx, runtime).await;
            }
            Err(Interruption::Failure(failure)) => {
                // Record the payload so the error chain shapes the response
                // from it, wherever the failure was raised.
                let _ = ctx.interrupt_with(failure);
                self.finalize_failure(ctx, runtime).await;
            }
            Err(Interruption::Technical(message)) => {
                tracing::error!(request_id = %ctx.request.id, error = %message, "Unexpected error while handling request");
                self.finalize_failure(ctx, runtime).await;
            }
        }

        ctx.response.end();
        metrics::record_request(&self.api.id, ctx.response.status.as_u16(), started_at);
        self.pending_requests.fetch_sub(1, Ordering::SeqCst);
    }

    fn prepare_context(&self, ctx: &mut ExecutionContext) {
        let context_path = ctx.request.context_path.clone();
        ctx.set_attribute(ATTR_API, self.api.id.clone());
        ctx.set_attribute(ATTR_CONTEXT_PATH, context_path);
        ctx.internal_mut()
            .put(ATTR_INTERNAL_INVOKER, InternalValue::Invoker(self.default_invoker.clone()));
        ctx.metrics.api_id = Some(self.api.id.clone());
        ctx.metrics.api_name = Some(self.api.name.clone());
    }

    async fn run_with_timeout(&self, ctx: &mut ExecutionContext, runtime: &ReactorRuntime) -> PhaseResult {
        if self.options.request_timeout.is_zero() {
            return self.execute_request(ctx, runtime).await;
        }

        // Grant at least the grace window even if the timeout already passed.
        let consumed = ctx.request.timestamp.elapsed().unwrap_or_default();
        let remaining = self
            .options
            .request_timeout
            .saturating_sub(consumed)
            .max(self.options.request_timeout_grace);

        match tokio::time::timeout(remaining, self.execute_request(ctx, runtime)).await {
            Ok(result) => result,
            Err(_) => Err(ctx.interrupt_with(ExecutionFailure::new(504, REQUEST_TIMEOUT_KEY, "Request timeout"))),
        }
    }

    /// REQUEST leg plus the success-row RESPONSE legs, in documented order.
    async fn execute_request(&self, ctx: &mut ExecutionContext, runtime: &ReactorRuntime) -> PhaseResult {
        self.platform_flow_chain.execute(ctx, ExecutionPhase::Request).await?;
        hooked(
            &runtime.processor_chain_hooks,
            self.pre_processors.id(),
            Some(ExecutionPhase::Request),
            self.pre_processors.execute(ctx, ExecutionPhase::Request),
        )
        .await?;
        runtime.security_chain.execute(ctx).await?;
        self.resolve_entrypoint(ctx)?;
        self.plan_flow_chain.execute(ctx, ExecutionPhase::Request).await?;
        self.api_flow_chain.execute(ctx, ExecutionPhase::Request).await?;
        self.invoke_backend(ctx, runtime).await?;
        self.plan_flow_chain.execute(ctx, ExecutionPhase::Response).await?;
        self.api_flow_chain.execute(ctx, ExecutionPhase::Response).await?;
        hooked(
            &runtime.processor_chain_hooks,
            self.post_processors.id(),
            Some(ExecutionPhase::Response),
            self.post_processors.execute(ctx, ExecutionPhase::Response),
        )
        .await?;
        self.platform_flow_chain.execute(ctx, ExecutionPhase::Response).await?;
        Ok(())
    }

    fn resolve_entrypoint(&self, ctx: &mut ExecutionContext) -> PhaseResult {
        if ctx.internal().entrypoint().is_some() {
            return Ok(());
        }
        match self.entrypoints.first() {
            Some(connector) => {
                ctx.internal_mut()
                    .put(ATTR_INTERNAL_ENTRYPOINT_CONNECTOR, InternalValue::Entrypoint(connector.clone()));
                Ok(())
            }
            None => Err(ctx.interrupt_with(ExecutionFailure::new(
                404,
                NO_ENTRYPOINT_FOUND_KEY,
                "No entrypoint matches the incoming request",
            ))),
        }
    }

    async fn invoke_backend(&self, ctx: &mut ExecutionContext, runtime: &ReactorRuntime) -> PhaseResult {
        if ctx.internal().flag(ATTR_INTERNAL_INVOKER_SKIP) {
            return Ok(());
        }
        // Read at invocation time: a policy may have replaced the invoker.
        let Some(invoker) = ctx.internal().invoker() else {
            return Ok(());
        };

        let invoked_at = Instant::now();
        let result = hooked(&runtime.invoker_hooks, invoker.id(), None, invoker.invoke(ctx)).await;
        // Recorded on every outcome, exactly once.
        ctx.metrics.endpoint_response_time = Some(invoked_at.elapsed());
        metrics::record_endpoint_time(&self.api.id, invoked_at);
        result
    }

    async fn finalize_benign(&self, ctx: &mut ExecutionContext, runtime: &ReactorRuntime) {
        let post = hooked(
            &runtime.processor_chain_hooks,
            self.post_processors.id(),
            Some(ExecutionPhase::Response),
            self.post_processors.execute(ctx, ExecutionPhase::Response),
        )
        .await;
        if let Err(error) = post {
            self.unexpected(ctx, error);
            return;
        }
        if let Err(error) = self.platform_flow_chain.execute(ctx, ExecutionPhase::Response).await {
            self.unexpected(ctx, error);
        }
    }

    async fn finalize_failure(&self, ctx: &mut ExecutionContext, runtime: &ReactorRuntime) {
        let outcome = hooked(
            &runtime.processor_chain_hooks,
            self.error_processors.id(),
            Some(ExecutionPhase::Response),
            self.error_processors.execute(ctx, ExecutionPhase::Response),
        )
        .await;
        if let Err(error) = outcome {
            self.unexpected(ctx, error);
        }
    }

    fn unexpected(&self, ctx: &mut ExecutionContext, error: Interruption) {
        tracing::error!(request_id = %ctx.request.id, error = %error, "Unexpected error while handling request");
        ctx.response.status = StatusCode::INTERNAL_SERVER_ERROR;
        ctx.response.reason = Some("Internal Server Error".to_string());
    }
}
