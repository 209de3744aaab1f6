//! Server binary: seed the in-memory store, wire the engine, serve HTTP.

use anyhow::Context as _;
use askflow_core::{EngineConfig, FlowEngine};
use askflow_graph::MemoryGraph;
use askflow_server::api::AppState;
use askflow_server::telemetry::Metrics;
use askflow_server::{router, seed, telemetry, ServerConfig};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    telemetry::init_tracing(config.log_json);

    let store = Arc::new(MemoryGraph::new());
    if let Some(path) = &config.seed_file {
        let seed_file = seed::SeedFile::from_path(path)
            .with_context(|| format!("loading seed file {}", path.display()))?;
        let (nodes, relationships) = seed::load(&store, &seed_file)?;
        tracing::info!(nodes, relationships, "seed loaded");
    }

    let engine = FlowEngine::new(store.clone()).with_config(
        EngineConfig::new().with_lenient_predicates(config.lenient_predicates),
    );

    let state = AppState {
        engine: Arc::new(engine),
        store,
        metrics: Arc::new(Metrics::new()?),
    };

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, "askflow server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
