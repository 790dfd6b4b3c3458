//! Gateway node binary.
//!
//! Loads the node configuration, verifies and deploys API definitions from
//! a directory, then serves until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use api_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use api_gateway::definition::Api;
use api_gateway::endpoint::EndpointPool;
use api_gateway::lifecycle::{NodeState, Shutdown};
use api_gateway::observability::{logging, metrics};
use api_gateway::plugin::PluginRegistry;
use api_gateway::reactor::{ApiReactor, ReactorComponents, ReactorOptions};
use api_gateway::subscription::SubscriptionCache;

#[derive(Parser, Debug)]
#[command(name = "api-gateway", about = "API gateway node")]
struct Args {
    /// Node configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of API definition files (JSON).
    #[arg(long)]
    apis: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, config_updates) = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            let (watcher, updates) = ConfigWatcher::new(path);
            watcher.spawn();
            (config, Some(updates))
        }
        None => (GatewayConfig::default(), None),
    };

    logging::init(&format!("api_gateway={}", config.observability.log_level));
    tracing::info!(node = %config.node.name, "api-gateway starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(builtin_registry());
    let subscriptions = Arc::new(SubscriptionCache::new());
    let node = Arc::new(NodeState::new());

    let options = ReactorOptions {
        tracing_enabled: config.services.tracing_enabled,
        request_timeout: std::time::Duration::from_millis(config.timeouts.request_ms),
        request_timeout_grace: std::time::Duration::from_millis(config.timeouts.request_grace_ms),
        pending_requests_timeout: std::time::Duration::from_millis(config.timeouts.pending_requests_ms),
    };

    let mut reactors = Vec::new();
    for api in load_definitions(args.apis.as_deref())? {
        let api = Arc::new(api);

        // Deploy-time verification: every plugin the API depends on must be
        // loadable, or the API is skipped.
        if let Err(missing) = registry.verify(&api) {
            for dependency in &missing {
                tracing::warn!(api_id = %api.id, dependency = %dependency, "Missing plugin dependency");
            }
            tracing::error!(api_id = %api.id, "API not deployed, missing plugins");
            continue;
        }

        let pool = Arc::new(EndpointPool::from_definition(&api));
        let reactor = ApiReactor::new(
            api.clone(),
            ReactorComponents {
                registry: registry.clone(),
                subscriptions: subscriptions.clone(),
                endpoint_pool: pool,
                platform_flows: Vec::new(),
                node: node.clone(),
                options: options.clone(),
                default_invoker: None,
                pre_processors: None,
                post_processors: None,
                error_processors: None,
            },
        );
        reactor.start();
        tracing::info!(api_id = %api.id, api_name = %api.name, "API deployed");
        reactors.push(Arc::new(reactor));
    }

    node.set_started(true);
    tracing::info!(deployed = reactors.len(), "api-gateway started");

    let shutdown = Shutdown::new();
    if let Some(mut updates) = config_updates {
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    update = updates.recv() => match update {
                        Some(update) => tracing::info!(
                            node = %update.node.name,
                            "Configuration updated, restart to apply reactor options"
                        ),
                        None => break,
                    },
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    shutdown.trigger();
    node.set_started(false);
    for reactor in &reactors {
        reactor.stop().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// The plugins this node can load. Policies are deployed separately; the
/// built-in connector types are always available.
fn builtin_registry() -> PluginRegistry {
    use api_gateway::plugin::PluginCategory;

    let mut registry = PluginRegistry::new();
    registry.declare(PluginCategory::EntrypointConnector, "http-proxy");
    registry.declare(PluginCategory::EntrypointConnector, "http-get");
    registry.declare(PluginCategory::EndpointConnector, "http-proxy");
    registry.declare(PluginCategory::EndpointConnector, "mock");
    registry
}

fn load_definitions(dir: Option<&std::path::Path>) -> Result<Vec<Api>, Box<dyn std::error::Error>> {
    let Some(dir) = dir else {
        return Ok(Vec::new());
    };

    let mut apis = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|extension| extension.to_str()) != Some("json") {
            continue;
        }
        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<Api>(&raw) {
            Ok(api) => apis.push(api),
            Err(error) => {
                tracing::error!(path = %path.display(), error = %error, "Skipping unparseable API definition");
            }
        }
    }
    Ok(apis)
}
