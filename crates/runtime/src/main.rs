//! Wires the index substrate, agent loop, tool registry, process
//! supervisor, and observability layer into one running process.
//!
//! Grounded on `gateway::main.rs`'s `init_tracing`/`load_config`/
//! `run_server` shape, minus the HTTP/CLI surface: this binary has no
//! `clap` subcommands and opens no network listener (spec §1 Non-goals —
//! the core defines no transport protocol), so `run_server` becomes
//! `run`: assemble every service, then idle until `SIGINT`/`SIGTERM`,
//! stopping any registered supervised processes on the way out. Driving
//! actual `AgentMind::process` calls from inbound requests is left to
//! whatever transport the embedding application puts in front of this.

mod llm_adapter;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use agentrt_agent::{AgentHands, AgentMind};
use agentrt_domain::config::{Config, StorageType};
use agentrt_graph::GraphIndex;
use agentrt_index::{ResourceIndex, TraceIndex};
use agentrt_observability::{Logger, TraceVisualizer, Tracer};
use agentrt_store::{LocalObjectStore, ObjectStore};
use agentrt_supervisor::SupervisionTree;
use agentrt_tools::{ExecTool, ToolRegistry};

use llm_adapter::UnimplementedLlmService;

/// Every long-lived service this process assembles, held for the
/// lifetime of `main` so nothing gets dropped out from under a spawned
/// task.
// No transport sits in front of this process (spec §1 Non-goals), so
// `mind`/`tracer`/`graph`/`visualizer`/`store`/`resources` are held live
// for an embedding application to reach into rather than driven by this
// binary itself.
#[allow(dead_code)]
struct AppState {
    store: Arc<dyn ObjectStore>,
    resources: Arc<ResourceIndex>,
    graph: Arc<GraphIndex>,
    mind: Arc<AgentMind>,
    tracer: Arc<Tracer>,
    visualizer: Arc<TraceVisualizer>,
    logger: Logger,
    supervisor: Arc<SupervisionTree>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = load_config()?;
    run(config).await
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,agentrt_runtime=debug")),
        )
        .json()
        .init();
}

/// Reads `AGENTRT_CONFIG` (defaulting to `config.toml`) if present, else
/// falls back to `Config::default()`. No CLI flag layering (spec §1
/// Non-goals: config loading is deliberately minimal).
fn load_config() -> anyhow::Result<Config> {
    let config_path = std::env::var("AGENTRT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    Ok(config)
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("agentrt starting");

    let state = assemble(config).await?;
    state.logger.info(&[], "runtime assembled, waiting for shutdown signal");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    drop(state);

    Ok(())
}

async fn assemble(config: Config) -> anyhow::Result<AppState> {
    if config.store.backend == StorageType::S3 {
        anyhow::bail!("storage backend 's3' is accepted by config but not implemented by this runtime");
    }

    let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(config.store.root.clone()));
    store.ensure_bucket().await?;

    let resources = Arc::new(ResourceIndex::new(store.clone(), "resources.jsonl"));
    let graph = Arc::new(GraphIndex::new(store.clone(), "graph.jsonl", "ontology.ttl"));
    let trace_index = Arc::new(TraceIndex::new(store.clone(), "traces.jsonl"));

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(ExecTool));
    let tools = Arc::new(tools);

    let llm = Arc::new(UnimplementedLlmService);
    let hands = Arc::new(AgentHands::new(llm, tools, resources.clone()));
    let mind = Arc::new(AgentMind::new(resources.clone(), store.clone(), hands));

    let tracer = Arc::new(Tracer::new(config.observability.app_id.clone(), trace_index));
    let visualizer = Arc::new(TraceVisualizer::from_config(&config.observability));
    let logger = Logger::from_config("agentrt_runtime", &config.observability);

    let log_root = std::path::Path::new(&config.store.root).join("logs");
    let supervisor = Arc::new(SupervisionTree::with_config(log_root, config.supervisor.clone()));

    Ok(AppState {
        store,
        resources,
        graph,
        mind,
        tracer,
        visualizer,
        logger,
        supervisor,
    })
}
