//! Source-node resolution.
//!
//! The source node is the walk's current "subject" - the node answered
//! checks and variable queries are anchored to. Sections and Actions may
//! declare a prefixed evaluator expression; edges additionally support the
//! bare `{{ variable }}` form, which promotes a resolved variable to the
//! source. An edge that declares a source expression always overwrites the
//! context - including with null when resolution fails - and the result is
//! visible to every edge reached afterwards.

use crate::context::Context;
use crate::engine::FlowEngine;
use crate::model::has_prefix;
use crate::template;
use askflow_graph::{GraphRel, GraphValue};

impl FlowEngine {
    /// Resolve a Section- or Action-level source expression. Only prefixed
    /// evaluator forms are recognised; failures keep the current source.
    pub(crate) async fn resolve_prefixed_source(&self, ctx: &mut Context, expr: &str) {
        let trimmed = expr.trim();
        let result = if has_prefix(trimmed, "cypher:") {
            Some(self.eval_cypher(ctx, trimmed).await)
        } else if has_prefix(trimmed, "python:") || has_prefix(trimmed, "script:") {
            Some(self.eval_script(ctx, trimmed, self.config.eval_timeout).await)
        } else {
            None
        };
        match result {
            Some(Ok(node)) => ctx.set_source(node),
            Some(Err(err)) => {
                tracing::warn!(expression = %trimmed, error = %err, "failed to resolve source node");
            }
            None => {}
        }
    }

    /// Resolve an edge's source node per the propagation rules and update
    /// the context for this edge and everything reached from it.
    pub(crate) async fn resolve_edge_source(&self, ctx: &mut Context, edge: &GraphRel) {
        let Some(value) = edge.property("sourceNode") else {
            return;
        };
        let Some(expr) = value.as_str() else {
            tracing::warn!("ignoring non-string sourceNode expression on edge");
            return;
        };
        let trimmed = expr.trim();

        let node = if has_prefix(trimmed, "cypher:") {
            self.eval_cypher(ctx, trimmed).await.unwrap_or_else(|err| {
                tracing::warn!(expression = %trimmed, error = %err, "edge source resolution failed");
                GraphValue::Null
            })
        } else if has_prefix(trimmed, "python:") || has_prefix(trimmed, "script:") {
            self.eval_script(ctx, trimmed, self.config.eval_timeout)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(expression = %trimmed, error = %err, "edge source resolution failed");
                    GraphValue::Null
                })
        } else if let Some(root) = template::bare_placeholder(trimmed) {
            self.resolve_var(ctx, root.to_string()).await
        } else {
            GraphValue::Null
        };

        ctx.set_source(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariableDef;
    use askflow_graph::{GraphNode, MemoryGraph, Record};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn rel_with_source(expr: Option<&str>) -> GraphRel {
        let mut properties = BTreeMap::new();
        if let Some(expr) = expr {
            properties.insert("sourceNode".to_string(), GraphValue::from(expr));
        }
        GraphRel {
            id: 1,
            element_id: "mem:r1".into(),
            rel_type: "PRECEDES".into(),
            start_element_id: "mem:1".into(),
            end_element_id: "mem:2".into(),
            properties,
        }
    }

    fn applicant() -> GraphValue {
        GraphValue::Node(GraphNode {
            id: 9,
            element_id: "mem:9".into(),
            labels: vec!["Applicant".into()],
            properties: BTreeMap::new(),
        })
    }

    #[tokio::test]
    async fn test_edge_without_expression_retains_source() {
        let engine = FlowEngine::new(Arc::new(MemoryGraph::new()));
        let mut ctx = Context::new(Default::default());
        ctx.set_source(applicant());

        engine
            .resolve_edge_source(&mut ctx, &rel_with_source(None))
            .await;
        assert!(ctx.source().as_node().is_some());
    }

    #[tokio::test]
    async fn test_edge_cypher_expression_sets_source() {
        let store = Arc::new(MemoryGraph::new());
        store.respond(
            "RETURN a",
            vec![Record::from_pairs(vec![("a".to_string(), applicant())])],
        );
        let engine = FlowEngine::new(store);
        let mut ctx = Context::new(Default::default());

        let edge = rel_with_source(Some("cypher: MATCH (a:Applicant) RETURN a"));
        engine.resolve_edge_source(&mut ctx, &edge).await;
        assert_eq!(ctx.source_node_id(), GraphValue::from("mem:9"));
    }

    #[tokio::test]
    async fn test_edge_bare_placeholder_promotes_variable() {
        let store = Arc::new(MemoryGraph::new());
        store.respond(
            "RETURN h",
            vec![Record::from_pairs(vec![(
                "h".to_string(),
                GraphValue::Node(GraphNode {
                    id: 4,
                    element_id: "mem:4".into(),
                    labels: vec!["AddressHistory".into()],
                    properties: BTreeMap::new(),
                }),
            )])],
        );
        let engine = FlowEngine::new(store);
        let mut ctx = Context::new(Default::default());
        ctx.merge_defs(vec![VariableDef {
            name: "current_history".into(),
            cypher: Some("MATCH (h:AddressHistory) RETURN h".into()),
            python: None,
            script: None,
            timeout_ms: None,
        }]);

        let edge = rel_with_source(Some("{{ current_history }}"));
        engine.resolve_edge_source(&mut ctx, &edge).await;
        assert_eq!(ctx.source_node_id(), GraphValue::from("mem:4"));
    }

    #[tokio::test]
    async fn test_failed_edge_resolution_clears_source() {
        let engine = FlowEngine::new(Arc::new(MemoryGraph::new()));
        let mut ctx = Context::new(Default::default());
        ctx.set_source(applicant());

        // Unknown statement: the store rejects it, resolution fails, and
        // the declared expression still overwrites the previous source.
        let edge = rel_with_source(Some("cypher: MATCH (x:Nope) RETURN x"));
        engine.resolve_edge_source(&mut ctx, &edge).await;
        assert!(ctx.source().is_null());
    }

    #[tokio::test]
    async fn test_prefixed_source_failure_keeps_existing() {
        let engine = FlowEngine::new(Arc::new(MemoryGraph::new()));
        let mut ctx = Context::new(Default::default());
        ctx.set_source(applicant());

        engine
            .resolve_prefixed_source(&mut ctx, "cypher: MATCH (x:Nope) RETURN x")
            .await;
        assert!(ctx.source().as_node().is_some());

        // Bare expressions are not recognised at Section/Action level.
        engine.resolve_prefixed_source(&mut ctx, "{{ some_var }}").await;
        assert!(ctx.source().as_node().is_some());
    }
}
