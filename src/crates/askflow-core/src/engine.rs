//! Engine facade
//!
//! [`FlowEngine`] bundles the immutable components a walk needs - the store
//! gateway, the sandbox, and the configuration - and exposes the single
//! entry point [`FlowEngine::walk`]. One engine instance serves any number
//! of concurrent walks; each walk owns its own [`Context`].
//!
//! # Example
//!
//! ```rust,ignore
//! use askflow_core::{EngineConfig, FlowEngine};
//! use askflow_graph::MemoryGraph;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryGraph::new());
//! // ... seed Sections, Questions, edges ...
//! let engine = FlowEngine::new(store).with_config(EngineConfig::new());
//!
//! let response = engine.walk("Get a Quote", request_params).await?;
//! match response.question {
//!     Some(q) => println!("next question: {}", q.question_id),
//!     None => println!("section complete"),
//! }
//! ```

use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{FlowError, Result};
use crate::model::{parse_variable_defs, EngineResponse};
use crate::sandbox::Sandbox;
use askflow_graph::{statements, Gateway, GraphStore, GraphValue, Params, RetryPolicy};
use serde_json::Value as Json;
use std::sync::Arc;

/// The questionnaire traversal engine.
pub struct FlowEngine {
    pub(crate) gateway: Gateway,
    pub(crate) sandbox: Sandbox,
    pub(crate) config: EngineConfig,
}

impl FlowEngine {
    /// Build an engine over `store` with default configuration.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            gateway: Gateway::new(store),
            sandbox: Sandbox::new(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.gateway = self.gateway.with_policy(policy);
        self
    }

    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Walk the questionnaire graph starting at `section_id`.
    ///
    /// Loads the Section, resolves its source-node expression (before
    /// variable definitions, so variables may reference `sourceNodeId`),
    /// installs its variable definitions, and traverses its outgoing edges
    /// depth-first until a stop condition is reached.
    pub async fn walk(
        &self,
        section_id: &str,
        input: serde_json::Map<String, Json>,
    ) -> Result<EngineResponse> {
        tracing::info!(section_id, "engine walk started");

        let mut params = Params::new();
        params.insert("sectionId".to_string(), GraphValue::from(section_id));
        let rows = self.gateway.run(statements::FETCH_SECTION, params).await?;
        let section = rows
            .first()
            .and_then(|row| row.get("s"))
            .and_then(|value| value.as_node())
            .cloned()
            .ok_or_else(|| FlowError::SectionNotFound(section_id.to_string()))?;

        let mut ctx = Context::new(input);

        if let Some(expr) = section
            .property("sourceNode")
            .and_then(|value| value.as_str())
            .map(str::to_string)
        {
            self.resolve_prefixed_source(&mut ctx, &expr).await;
        }

        if let Some(raw) = section.property("variables") {
            ctx.merge_defs(parse_variable_defs(raw));
        }

        let response = self.traverse(&mut ctx, section, section_id).await?;

        tracing::info!(
            completed = response.completed,
            question = response
                .question
                .as_ref()
                .map(|q| q.question_id.as_str())
                .unwrap_or(""),
            next_section = response.next_section_id.as_deref().unwrap_or(""),
            warning_count = response.warnings.len(),
            "engine walk finished"
        );
        Ok(response)
    }
}
