//! HTTP API surface.

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::router;

use crate::telemetry::Metrics;
use askflow_core::FlowEngine;
use askflow_graph::MemoryGraph;
use std::sync::Arc;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FlowEngine>,
    pub store: Arc<MemoryGraph>,
    pub metrics: Arc<Metrics>,
}
